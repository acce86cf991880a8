// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Conversion of raw detections into the wire schema

use serde::{Deserialize, Serialize};

use super::detector::{ObjectDetector, RawDetection};

/// One detected object as returned by `POST /detect`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Display label, e.g. "Grocery Item"
    pub label: String,
    /// Numeric class id from the model
    pub class_id: usize,
    /// Confidence rounded to 2 decimals
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` in source-image pixels, rounded to 2 decimals
    #[serde(rename = "box")]
    pub bbox: [f64; 4],
}

/// Round to 2 decimal places, exact ties to even
///
/// Scaling an `f32` by 100 is exact in `f64`, so a tie here is a tie in the
/// decimal value too: `0.125` rounds to `0.12`, `0.375` to `0.38`.
pub fn round2(value: f32) -> f64 {
    (value as f64 * 100.0).round_ties_even() / 100.0
}

/// Turn a model class name into a display label
///
/// Underscores become spaces and every alphabetic run starts uppercase with
/// the rest lowercase: `grocery_item` becomes `Grocery Item`.
pub fn display_label(name: &str) -> String {
    let mut label = String::with_capacity(name.len());
    let mut previous_cased = false;

    for c in name.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if previous_cased {
                label.extend(c.to_lowercase());
            } else {
                label.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            label.push(c);
            previous_cased = false;
        }
    }

    label
}

/// Normalize one raw detection using the detector's class table
pub fn to_record(detector: &dyn ObjectDetector, raw: &RawDetection) -> DetectionRecord {
    let label = match detector.class_name(raw.class_id) {
        Some(name) => display_label(name),
        None => display_label(&format!("class_{}", raw.class_id)),
    };

    DetectionRecord {
        label,
        class_id: raw.class_id,
        confidence: round2(raw.confidence),
        bbox: raw.bbox.map(round2),
    }
}

/// Normalize a whole response, preserving the detector's emission order
pub fn normalize_detections(
    detector: &dyn ObjectDetector,
    raw: &[RawDetection],
) -> Vec<DetectionRecord> {
    raw.iter().map(|det| to_record(detector, det)).collect()
}
