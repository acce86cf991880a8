// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection: model contract, ONNX YOLO adapter, model resolution
//! and response normalization
//!
//! Components:
//! - `detector` - The capability trait the server depends on
//! - `resolver` - Startup selection of the serving model with fallback
//! - `yolo` - ONNX Runtime implementation of the detector
//! - `nms` - Per-class non-maximum suppression
//! - `labels` - Class-name tables
//! - `normalize` - Raw detections to the JSON wire schema

pub mod detector;
pub mod labels;
pub mod nms;
pub mod normalize;
pub mod resolver;
pub mod yolo;

pub use detector::{DetectorError, ObjectDetector, RawDetection};
pub use normalize::{display_label, normalize_detections, round2, DetectionRecord};
pub use resolver::{
    LoadError, ModelLoader, ModelResolver, OnnxModelLoader, ResolveError, ResolvedModel,
    ResolverConfig,
};
pub use yolo::{OnnxYoloDetector, YoloOptions};

/// Detections scoring below this are discarded
pub const CONFIDENCE_THRESHOLD: f32 = 0.35;

/// Same-class boxes overlapping more than this are suppressed
pub const IOU_THRESHOLD: f32 = 0.45;
