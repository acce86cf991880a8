// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image codec helpers for uploaded detection frames

pub mod image_utils;

pub use image_utils::{
    decode_image_bytes, detect_format, format_to_extension, ImageError, ImageInfo,
};
