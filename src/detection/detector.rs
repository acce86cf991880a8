// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector capability contract
//!
//! The resolver and the `/detect` endpoint depend only on [`ObjectDetector`]:
//! something that can be invoked with a decoded image plus the two
//! thresholds, and that can map class ids to names.

use image::DynamicImage;
use thiserror::Error;

/// Errors raised by a detector during inference
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("{0}")]
    Inference(String),

    #[error("unexpected model output shape {0:?}")]
    OutputShape(Vec<usize>),
}

/// One detection as emitted by the model, already filtered and suppressed
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// Numeric class identifier
    pub class_id: usize,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Box corners `[xmin, ymin, xmax, ymax]` in source-image pixels
    pub bbox: [f32; 4],
}

impl RawDetection {
    pub fn new(class_id: usize, confidence: f32, bbox: [f32; 4]) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// Object detection capability
///
/// Implementations must be shareable across request tasks. An implementation
/// whose runtime is not reentrant serializes calls internally.
pub trait ObjectDetector: Send + Sync {
    /// Run detection on one decoded image
    ///
    /// Detections scoring below `confidence` are discarded and overlapping
    /// same-class boxes with IoU above `iou` are suppressed before returning.
    fn detect(
        &self,
        image: &DynamicImage,
        confidence: f32,
        iou: f32,
    ) -> Result<Vec<RawDetection>, DetectorError>;

    /// Human-readable name for a class id, as stored in the model
    fn class_name(&self, class_id: usize) -> Option<&str>;

    /// Number of classes the model knows about
    fn class_count(&self) -> usize;

    /// Short model name for logs and health reporting
    fn name(&self) -> &str;
}
