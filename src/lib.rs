// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod detection;
pub mod version;
pub mod vision;

pub use api::{create_app, AppState};
pub use config::ServerConfig;
pub use detection::{
    DetectionRecord, ModelLoader, ModelResolver, ObjectDetector, RawDetection, ResolvedModel,
    ResolverConfig,
};
