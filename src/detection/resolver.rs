// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detection model resolution
//!
//! Picks the single detection model the server runs with. Candidates are
//! probed in priority order (most accurate first); the first one that exists,
//! is larger than the size threshold and loads cleanly wins. If none does,
//! the lightweight fallback artifact is loaded unconditionally, and only a
//! failure there is fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::detector::ObjectDetector;
use super::yolo::{OnnxYoloDetector, YoloOptions};

/// Artifacts at or below this size are treated as placeholders
pub const DEFAULT_MIN_MODEL_BYTES: u64 = 1_000_000;

/// Lightweight model loaded when no candidate qualifies
pub const DEFAULT_FALLBACK_MODEL: &str = "yolov8n.onnx";

/// Candidate artifacts, fine-tuned runs first, stock checkpoints last
pub const DEFAULT_MODEL_CANDIDATES: [&str; 5] = [
    "ml/runs/skipq_pro_plus/weights/best.onnx",
    "ml/runs/skipq_retail/weights/best.onnx",
    "ml/best_skipq_model.onnx",
    "yolov8m.onnx",
    "yolov8n.onnx",
];

/// Failure to load one model artifact
#[derive(Debug, Error)]
#[error("failed to load {path}: {reason}")]
pub struct LoadError {
    pub path: PathBuf,
    pub reason: String,
}

impl LoadError {
    pub fn new(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Resolution failed entirely; the server must not start
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("fallback model {path} could not be loaded: {reason}")]
    FallbackFailed { path: PathBuf, reason: String },
}

/// Turns a model artifact path into a ready detector
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn ObjectDetector>, LoadError>;
}

/// Loader for ONNX YOLO exports
#[derive(Debug, Clone, Default)]
pub struct OnnxModelLoader {
    options: YoloOptions,
}

impl OnnxModelLoader {
    pub fn new(options: YoloOptions) -> Self {
        Self { options }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ObjectDetector>, LoadError> {
        OnnxYoloDetector::load(path, &self.options)
            .map(|detector| Arc::new(detector) as Arc<dyn ObjectDetector>)
            .map_err(|e| LoadError::new(path, format!("{:#}", e)))
    }
}

/// Resolver inputs
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Candidate artifacts in priority order
    pub candidates: Vec<PathBuf>,
    /// Candidates must be strictly larger than this many bytes
    pub min_model_bytes: u64,
    /// Artifact loaded when every candidate is skipped or fails
    pub fallback_model: PathBuf,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_MODEL_CANDIDATES.iter().map(PathBuf::from).collect(),
            min_model_bytes: DEFAULT_MIN_MODEL_BYTES,
            fallback_model: PathBuf::from(DEFAULT_FALLBACK_MODEL),
        }
    }
}

/// The model the process serves with; built once, shared read-only
#[derive(Clone)]
pub struct ResolvedModel {
    /// The loaded detector
    pub detector: Arc<dyn ObjectDetector>,
    /// Artifact it was loaded from
    pub source: PathBuf,
    /// Whether the fallback artifact had to be used
    pub is_fallback: bool,
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("name", &self.detector.name())
            .field("source", &self.source)
            .field("is_fallback", &self.is_fallback)
            .finish()
    }
}

/// Probes candidate artifacts and loads the first usable one
pub struct ModelResolver<L: ModelLoader> {
    config: ResolverConfig,
    loader: L,
}

impl<L: ModelLoader> ModelResolver<L> {
    pub fn new(config: ResolverConfig, loader: L) -> Self {
        Self { config, loader }
    }

    /// Whether a candidate is worth a load attempt: it exists, is a regular
    /// file, and is larger than the size threshold
    pub fn is_eligible(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) => meta.is_file() && meta.len() > self.config.min_model_bytes,
            Err(_) => false,
        }
    }

    /// Select and load the serving model
    ///
    /// First match wins; later candidates are never touched once one loads.
    pub fn resolve(&self) -> Result<ResolvedModel, ResolveError> {
        for candidate in &self.config.candidates {
            if !self.is_eligible(candidate) {
                debug!(
                    "Skipping {}: missing or not larger than {} bytes",
                    candidate.display(),
                    self.config.min_model_bytes
                );
                continue;
            }

            info!("Loading detection engine: {}", candidate.display());
            match self.loader.load(candidate) {
                Ok(detector) => {
                    info!(
                        "✅ Core engine active: {} ({} classes)",
                        candidate.display(),
                        detector.class_count()
                    );
                    return Ok(ResolvedModel {
                        detector,
                        source: candidate.clone(),
                        is_fallback: false,
                    });
                }
                Err(e) => {
                    warn!("⚠️ Engine {} failed: {}", candidate.display(), e.reason);
                }
            }
        }

        let fallback = &self.config.fallback_model;
        info!(
            "Deploying lightweight emergency engine: {}",
            fallback.display()
        );
        match self.loader.load(fallback) {
            Ok(detector) => {
                info!("✅ Fallback engine active: {}", fallback.display());
                Ok(ResolvedModel {
                    detector,
                    source: fallback.clone(),
                    is_fallback: true,
                })
            }
            Err(e) => {
                error!("❌ Fallback engine {} failed: {}", fallback.display(), e.reason);
                Err(ResolveError::FallbackFailed {
                    path: fallback.clone(),
                    reason: e.reason,
                })
            }
        }
    }
}
