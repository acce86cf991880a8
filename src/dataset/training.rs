// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Trainer invocation for an assembled dataset
//!
//! Training runs in the external YOLO trainer; this only renders the
//! commands, with the run settings the serving model was produced with.

use std::path::{Path, PathBuf};

/// Settings for one training run plus its ONNX export
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPlan {
    pub data_yaml: PathBuf,
    /// Pretrained checkpoint to fine-tune from
    pub base_model: String,
    pub epochs: u32,
    pub image_size: u32,
    pub batch: u32,
    /// Early-stopping patience in epochs
    pub patience: u32,
    pub seed: u64,
    /// Directory the trainer writes runs into
    pub project: PathBuf,
    /// Run name inside `project`
    pub name: String,
}

impl TrainingPlan {
    pub fn new(data_yaml: impl Into<PathBuf>, project: impl Into<PathBuf>) -> Self {
        Self {
            data_yaml: data_yaml.into(),
            base_model: "yolov8n.pt".to_string(),
            epochs: 50,
            image_size: 640,
            batch: 16,
            patience: 10,
            seed: super::SHUFFLE_SEED,
            project: project.into(),
            name: "skipq_retail".to_string(),
        }
    }

    pub fn run_dir(&self) -> PathBuf {
        self.project.join(&self.name)
    }

    /// Checkpoint the trainer keeps for the best epoch
    pub fn best_weights(&self) -> PathBuf {
        self.run_dir().join("weights").join("best.pt")
    }

    /// Where the ONNX export lands; this is a default serving candidate
    pub fn exported_model(&self) -> PathBuf {
        self.best_weights().with_extension("onnx")
    }

    pub fn train_command(&self) -> Vec<String> {
        vec![
            "yolo".to_string(),
            "detect".to_string(),
            "train".to_string(),
            arg("data", &self.data_yaml),
            format!("model={}", self.base_model),
            format!("epochs={}", self.epochs),
            format!("imgsz={}", self.image_size),
            format!("batch={}", self.batch),
            format!("patience={}", self.patience),
            arg("project", &self.project),
            format!("name={}", self.name),
            "exist_ok=True".to_string(),
            "pretrained=True".to_string(),
            format!("seed={}", self.seed),
        ]
    }

    pub fn validate_command(&self) -> Vec<String> {
        vec![
            "yolo".to_string(),
            "detect".to_string(),
            "val".to_string(),
            arg("model", &self.best_weights()),
            arg("data", &self.data_yaml),
        ]
    }

    pub fn export_command(&self) -> Vec<String> {
        vec![
            "yolo".to_string(),
            "export".to_string(),
            arg("model", &self.best_weights()),
            "format=onnx".to_string(),
            "simplify=True".to_string(),
            format!("imgsz={}", self.image_size),
        ]
    }
}

fn arg(key: &str, path: &Path) -> String {
    format!("{}={}", key, path.display())
}
