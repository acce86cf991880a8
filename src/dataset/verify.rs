// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Dataset verification

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{DatasetError, Split};

/// File counts per split and training images lacking a label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSummary {
    pub train_images: usize,
    pub train_labels: usize,
    pub val_images: usize,
    pub val_labels: usize,
    /// Stems of training images with no matching `.txt` label, sorted
    pub missing_train_labels: Vec<String>,
}

impl DatasetSummary {
    pub fn is_complete(&self) -> bool {
        self.missing_train_labels.is_empty()
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|entry| entry.map(|e| e.path()).map_err(|e| DatasetError::io(dir, e)))
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(DatasetError::io(dir, e)),
    }
}

fn stems<'a>(paths: impl Iterator<Item = &'a PathBuf>) -> BTreeSet<String> {
    paths
        .filter_map(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .collect()
}

fn is_label(path: &Path) -> bool {
    path.extension().map(|ext| ext == "txt").unwrap_or(false)
}

/// Count images and labels in both splits and find unlabelled training images
pub fn verify_dataset(root: &Path) -> Result<DatasetSummary, DatasetError> {
    let train_images = list_dir(&Split::Train.images_dir(root))?;
    let train_labels: Vec<PathBuf> = list_dir(&Split::Train.labels_dir(root))?
        .into_iter()
        .filter(|p| is_label(p))
        .collect();
    let val_images = list_dir(&Split::Val.images_dir(root))?;
    let val_labels = list_dir(&Split::Val.labels_dir(root))?
        .into_iter()
        .filter(|p| is_label(p))
        .count();

    let labelled = stems(train_labels.iter());
    let missing_train_labels: Vec<String> = stems(train_images.iter())
        .into_iter()
        .filter(|stem| !labelled.contains(stem))
        .collect();

    let summary = DatasetSummary {
        train_images: train_images.len(),
        train_labels: train_labels.len(),
        val_images: val_images.len(),
        val_labels,
        missing_train_labels,
    };

    info!(
        "Dataset: {} train images, {} train labels, {} val images, {} val labels",
        summary.train_images, summary.train_labels, summary.val_images, summary.val_labels
    );
    if summary.is_complete() {
        info!("All training images have corresponding labels");
    } else {
        warn!(
            "{} training images missing labels",
            summary.missing_train_labels.len()
        );
    }

    Ok(summary)
}
