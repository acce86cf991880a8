// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection API endpoint module
//!
//! Provides POST /detect for locating objects in an uploaded image.

pub mod handler;

pub use handler::{detect_handler, read_image_field, run_detection, IMAGE_FIELD};
