// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the SkipQ detector

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-model-fallback-2026-10-16";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2026-10-16";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "multipart-detect",
    "model-fallback",
    "onnx-yolo",
    "per-class-nms",
    "cors-any-origin",
    "dataset-assembly",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!(
        "SkipQ Detector {} ({}) [{}]",
        VERSION_NUMBER,
        BUILD_DATE,
        FEATURES.join(", ")
    )
}
