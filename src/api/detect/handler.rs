// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::detection::{
    normalize_detections, DetectionRecord, ObjectDetector, CONFIDENCE_THRESHOLD, IOU_THRESHOLD,
};
use crate::vision::{decode_image_bytes, format_to_extension};

/// Multipart field carrying the upload
pub const IMAGE_FIELD: &str = "image";

/// POST /detect - Detect objects in an uploaded image
///
/// # Request
/// `multipart/form-data` with one file field named `image`.
///
/// # Response
/// JSON array, one entry per detected object:
/// - `label`: Title-cased class name ("Grocery Item")
/// - `class_id`: Numeric class id
/// - `confidence`: Score rounded to 2 decimals
/// - `box`: `[x1, y1, x2, y2]` in source pixels, rounded to 2 decimals
///
/// # Errors
/// - 400 `No image sent`: no `image` file field (or not a multipart body)
/// - 400 `Invalid image format`: the bytes do not decode as an image
/// - 413: upload larger than the configured limit
/// - 500 `Detection failed: ...`: the model raised during inference
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<DetectionRecord>>, ApiError> {
    let multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            debug!("Detect request without multipart body: {}", rejection);
            return Err(ApiError::MissingImage);
        }
    };

    let upload = read_image_field(multipart).await?;
    let detector = Arc::clone(&state.model.detector);

    let records = run_detection(detector, upload).await?;
    Ok(Json(records))
}

/// Pull the first `image` file field out of the form; other fields are ignored
pub async fn read_image_field(mut multipart: Multipart) -> Result<Option<Bytes>, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return Err(multipart_failure(e.status(), &e.body_text())),
        };

        // A plain text field named `image` carries no upload
        if field.name() != Some(IMAGE_FIELD) || field.file_name().is_none() {
            continue;
        }

        return match field.bytes().await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => Err(multipart_failure(e.status(), &e.body_text())),
        };
    }
}

fn multipart_failure(status: StatusCode, detail: &str) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload rejected: {}", detail);
        ApiError::PayloadTooLarge
    } else {
        debug!("Malformed multipart body: {}", detail);
        ApiError::MissingImage
    }
}

/// Decode the upload and run the detector with the fixed thresholds
///
/// Decoding and inference are CPU-bound and run on the blocking pool.
pub async fn run_detection(
    detector: Arc<dyn ObjectDetector>,
    upload: Option<Bytes>,
) -> Result<Vec<DetectionRecord>, ApiError> {
    let bytes = upload.ok_or(ApiError::MissingImage)?;

    let task = tokio::task::spawn_blocking(move || -> Result<Vec<DetectionRecord>, ApiError> {
        let start = Instant::now();

        let (image, image_info) = decode_image_bytes(&bytes).map_err(|e| {
            warn!("Failed to decode upload: {}", e);
            ApiError::InvalidImage
        })?;
        debug!(
            "Decoded image: {}x{} {}, {} bytes",
            image_info.width,
            image_info.height,
            format_to_extension(image_info.format),
            image_info.size_bytes
        );

        let raw = detector
            .detect(&image, CONFIDENCE_THRESHOLD, IOU_THRESHOLD)
            .map_err(|e| {
                warn!("Detection failed: {}", e);
                ApiError::DetectionFailed(e.to_string())
            })?;

        let records = normalize_detections(detector.as_ref(), &raw);
        info!(
            "Detection complete: {} objects, {}ms ({})",
            records.len(),
            start.elapsed().as_millis(),
            detector.name()
        );
        Ok(records)
    });

    task.await
        .map_err(|e| ApiError::DetectionFailed(e.to_string()))?
}
