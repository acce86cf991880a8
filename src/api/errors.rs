// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of every error response: `{"error": "<message>"}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    /// Request carried no `image` field
    MissingImage,
    /// Payload could not be decoded into pixels
    InvalidImage,
    /// Upload exceeded the configured body limit
    PayloadTooLarge,
    /// The model invocation failed
    DetectionFailed(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::MissingImage | ApiError::InvalidImage => 400,
            ApiError::PayloadTooLarge => 413,
            ApiError::DetectionFailed(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::MissingImage => write!(f, "No image sent"),
            ApiError::InvalidImage => write!(f, "Invalid image format"),
            ApiError::PayloadTooLarge => write!(f, "Image exceeds upload limit"),
            ApiError::DetectionFailed(msg) => write!(f, "Detection failed: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
