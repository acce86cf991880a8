// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Every setting is a command-line flag with an environment override, so the
//! service runs unchanged from a shell, a `.env` file or a container.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::api::DEFAULT_MAX_UPLOAD_BYTES;
use crate::detection::resolver::{
    DEFAULT_FALLBACK_MODEL, DEFAULT_MIN_MODEL_BYTES, DEFAULT_MODEL_CANDIDATES,
};
use crate::detection::yolo::DEFAULT_INPUT_SIZE;
use crate::detection::{ResolverConfig, YoloOptions};

/// SkipQ object detection server
#[derive(Parser, Debug, Clone)]
#[command(name = "skipq-detector")]
#[command(about = "Object detection HTTP service", long_about = None)]
pub struct ServerConfig {
    /// Interface to bind
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "API_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Comma-separated model artifacts, highest priority first
    #[arg(
        long = "model-candidates",
        env = "MODEL_CANDIDATES",
        value_delimiter = ',',
        default_values = DEFAULT_MODEL_CANDIDATES
    )]
    pub model_candidates: Vec<PathBuf>,

    /// Model loaded when no candidate qualifies
    #[arg(long, env = "FALLBACK_MODEL", default_value = DEFAULT_FALLBACK_MODEL)]
    pub fallback_model: PathBuf,

    /// Candidates at or below this many bytes are skipped
    #[arg(long, env = "MIN_MODEL_BYTES", default_value_t = DEFAULT_MIN_MODEL_BYTES)]
    pub min_model_bytes: u64,

    /// Optional class-names file (one name per line)
    #[arg(long, env = "MODEL_LABELS")]
    pub labels: Option<PathBuf>,

    /// Square model input size
    #[arg(long, env = "MODEL_INPUT_SIZE", default_value_t = DEFAULT_INPUT_SIZE)]
    pub input_size: u32,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "INFERENCE_THREADS", default_value_t = 4)]
    pub inference_threads: usize,

    /// Maximum accepted request body in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            candidates: self.model_candidates.clone(),
            min_model_bytes: self.min_model_bytes,
            fallback_model: self.fallback_model.clone(),
        }
    }

    pub fn yolo_options(&self) -> YoloOptions {
        YoloOptions {
            input_size: self.input_size,
            intra_threads: self.inference_threads,
            labels_path: self.labels.clone(),
        }
    }
}
