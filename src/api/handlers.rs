// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::http_server::AppState;
use crate::version::VERSION_NUMBER;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Name of the serving model
    pub ml_engine: String,
    /// Artifact the model was loaded from
    pub model_path: String,
    /// True when no candidate qualified and the fallback is serving
    pub fallback: bool,
    pub classes: usize,
    pub version: String,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = &state.model;
    Json(HealthResponse {
        status: "online".to_string(),
        ml_engine: model.detector.name().to_string(),
        model_path: model.source.display().to_string(),
        fallback: model.is_fallback,
        classes: model.detector.class_count(),
        version: VERSION_NUMBER.to_string(),
    })
}
