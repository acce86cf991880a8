// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Training-set assembly
//!
//! Combines a labelled stationery set with an unlabelled grocery set into
//! the YOLO directory layout (`images/{train,val}`, `labels/{train,val}`),
//! writes `data.yaml`, and checks the result. Grocery images carry a single
//! near-full-frame pseudo-label of the `grocery_item` class.

pub mod prepare;
pub mod training;
pub mod verify;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use prepare::{prepare_dataset, render_data_yaml, PrepareOptions, PrepareReport};
pub use training::TrainingPlan;
pub use verify::{verify_dataset, DatasetSummary};

/// Share of stationery images placed in the training split
pub const TRAIN_RATIO: f64 = 0.85;

/// Seed for every shuffle, so repeated runs produce the same split
pub const SHUFFLE_SEED: u64 = 42;

/// Cap on grocery training images, keeps the classes roughly balanced
pub const MAX_GROCERY_TRAIN: usize = 200;

/// Cap on grocery validation images
pub const MAX_GROCERY_VAL: usize = 50;

pub const STATIONERY_PREFIX: &str = "stat_";
pub const GROCERY_PREFIX: &str = "groc_";

pub const STATIONERY_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
pub const GROCERY_EXTENSIONS: &[&str] = &["jpg"];

/// Class table of the combined model; stationery ids are kept as annotated
pub const COMBINED_CLASSES: [&str; 5] = ["eraser", "scale", "pencil", "sharpener", "grocery_item"];

/// Label line written for grocery images: centred box covering 90% of the frame
pub const PSEUDO_LABEL: &str = "4 0.5 0.5 0.9 0.9\n";

pub const DATA_YAML: &str = "data.yaml";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DatasetError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// One side of the train/validation split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
}

impl Split {
    pub fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }

    pub fn images_dir(self, root: &Path) -> PathBuf {
        root.join("images").join(self.dir_name())
    }

    pub fn labels_dir(self, root: &Path) -> PathBuf {
        root.join("labels").join(self.dir_name())
    }
}
