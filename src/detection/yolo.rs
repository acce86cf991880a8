// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime adapter for YOLOv8-family detection models
//!
//! Wraps a model exported by the trainer (`format=onnx`) behind the
//! [`ObjectDetector`] contract:
//! - Letterbox preprocessing to the model input size
//! - Decoding of the `[1, 4 + nc, N]` prediction tensor
//! - Confidence filtering and per-class NMS
//! - Class names from a labels file, model metadata, or COCO

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array4, ArrayViewD, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::detector::{DetectorError, ObjectDetector, RawDetection};
use super::labels::{coco_names, load_labels_file, parse_names_metadata};
use super::nms::non_max_suppression;

/// Default square input size of YOLOv8 exports
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Upper bound on detections returned per image
pub const MAX_DETECTIONS: usize = 300;

/// Grey padding used by the letterbox transform
const LETTERBOX_PAD: f32 = 114.0 / 255.0;

/// Options for loading a YOLO model
#[derive(Debug, Clone)]
pub struct YoloOptions {
    /// Square model input size in pixels
    pub input_size: u32,
    /// Intra-op threads for ONNX Runtime
    pub intra_threads: usize,
    /// Optional labels file overriding model metadata
    pub labels_path: Option<PathBuf>,
}

impl Default for YoloOptions {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            intra_threads: 4,
            labels_path: None,
        }
    }
}

/// Geometry of a letterbox transform, used to map boxes back to the source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub src_width: f32,
    pub src_height: f32,
}

impl Letterbox {
    pub fn new(src_width: u32, src_height: u32, input_size: u32) -> Self {
        let scale = (input_size as f32 / src_width as f32).min(input_size as f32 / src_height as f32);
        let new_w = (src_width as f32 * scale).round();
        let new_h = (src_height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((input_size as f32 - new_w) / 2.0).floor(),
            pad_y: ((input_size as f32 - new_h) / 2.0).floor(),
            src_width: src_width as f32,
            src_height: src_height as f32,
        }
    }

    /// Map a `cx, cy, w, h` box in model space to clipped source `[x1, y1, x2, y2]`
    pub fn unmap(&self, cx: f32, cy: f32, w: f32, h: f32) -> [f32; 4] {
        let x1 = (cx - w / 2.0 - self.pad_x) / self.scale;
        let y1 = (cy - h / 2.0 - self.pad_y) / self.scale;
        let x2 = (cx + w / 2.0 - self.pad_x) / self.scale;
        let y2 = (cy + h / 2.0 - self.pad_y) / self.scale;
        [
            x1.clamp(0.0, self.src_width),
            y1.clamp(0.0, self.src_height),
            x2.clamp(0.0, self.src_width),
            y2.clamp(0.0, self.src_height),
        ]
    }
}

/// Letterbox an image into a `[1, 3, size, size]` tensor scaled to [0, 1]
pub fn preprocess(image: &DynamicImage, input_size: u32) -> (Array4<f32>, Letterbox) {
    let rgb = image.to_rgb8();
    let letterbox = Letterbox::new(rgb.width(), rgb.height(), input_size);

    let new_w = ((rgb.width() as f32 * letterbox.scale).round() as u32).clamp(1, input_size);
    let new_h = ((rgb.height() as f32 * letterbox.scale).round() as u32).clamp(1, input_size);
    let resized = image::imageops::resize(&rgb, new_w, new_h, FilterType::Triangle);

    let size = input_size as usize;
    let mut input = Array4::<f32>::from_elem((1, 3, size, size), LETTERBOX_PAD);
    let (pad_x, pad_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);

    for (x, y, pixel) in resized.enumerate_pixels() {
        let (px, py) = (x as usize + pad_x, y as usize + pad_y);
        if px >= size || py >= size {
            continue;
        }
        input[[0, 0, py, px]] = pixel[0] as f32 / 255.0;
        input[[0, 1, py, px]] = pixel[1] as f32 / 255.0;
        input[[0, 2, py, px]] = pixel[2] as f32 / 255.0;
    }

    (input, letterbox)
}

/// Decode a YOLOv8 prediction tensor into source-space candidates
///
/// Accepts `[1, 4 + nc, N]` as exported, or the transposed `[1, N, 4 + nc]`.
/// Candidates scoring below `confidence` are dropped; NMS is not applied.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    letterbox: &Letterbox,
    confidence: f32,
    class_count: usize,
) -> Result<Vec<RawDetection>, DetectorError> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(DetectorError::OutputShape(shape));
    }

    let view = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map_err(|_| DetectorError::OutputShape(shape.clone()))?;

    let attributes_first = if shape[1] == class_count + 4 {
        true
    } else if shape[2] == class_count + 4 {
        false
    } else {
        // Label table disagrees with the model; exports have far more
        // candidates than attributes.
        shape[1] <= shape[2]
    };
    let view = if attributes_first {
        view
    } else {
        view.reversed_axes()
    };

    let attributes = view.shape()[0];
    if attributes <= 4 {
        return Err(DetectorError::OutputShape(shape));
    }

    let mut detections = Vec::new();
    for candidate in view.axis_iter(Axis(1)) {
        let (class_id, score) = candidate
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (i, s)| if s > best.1 { (i, s) } else { best });

        if score < confidence {
            continue;
        }

        let bbox = letterbox.unmap(candidate[0], candidate[1], candidate[2], candidate[3]);
        if bbox[2] <= bbox[0] || bbox[3] <= bbox[1] {
            continue;
        }
        detections.push(RawDetection::new(class_id, score, bbox));
    }

    Ok(detections)
}

/// YOLO detection model running on ONNX Runtime
///
/// Runs on CPU. `Session::run` needs exclusive access, so concurrent requests
/// against one handle are serialized on the session mutex.
pub struct OnnxYoloDetector {
    /// ONNX Runtime session (wrapped in Arc<Mutex> for thread-safe shared access)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Class names indexed by class id
    class_names: Vec<String>,
    /// Square model input size
    input_size: u32,
    /// Model name derived from the artifact file name
    model_name: String,
}

impl std::fmt::Debug for OnnxYoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxYoloDetector")
            .field("model_name", &self.model_name)
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("classes", &self.class_names.len())
            .finish_non_exhaustive()
    }
}

impl OnnxYoloDetector {
    /// Load a YOLO model from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - The configured labels file cannot be read
    pub fn load<P: AsRef<Path>>(model_path: P, options: &YoloOptions) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(options.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let class_names = match &options.labels_path {
            Some(path) => load_labels_file(path)
                .with_context(|| format!("Failed to read labels file {}", path.display()))?,
            None => {
                let from_metadata = session
                    .metadata()
                    .ok()
                    .and_then(|meta| meta.custom("names").ok().flatten())
                    .and_then(|raw| parse_names_metadata(&raw));
                match from_metadata {
                    Some(names) => names,
                    None => {
                        warn!(
                            "No class names in {} metadata, using COCO names",
                            model_path.display()
                        );
                        coco_names()
                    }
                }
            }
        };

        let model_name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "yolo".to_string());

        debug!(
            "Detection model {} - input: {}, classes: {}",
            model_name,
            input_name,
            class_names.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            class_names,
            input_size: options.input_size,
            model_name,
        })
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(
        &self,
        image: &DynamicImage,
        confidence: f32,
        iou: f32,
    ) -> Result<Vec<RawDetection>, DetectorError> {
        let (input, letterbox) = preprocess(image, self.input_size);

        let input_value = Value::from_array(input)
            .map_err(|e| DetectorError::Inference(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectorError::Inference("detection session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectorError::Inference(format!("Failed to extract output tensor: {}", e)))?;

        let candidates =
            decode_predictions(output.view(), &letterbox, confidence, self.class_names.len())?;
        debug!("{} candidates above {:.2}", candidates.len(), confidence);

        Ok(non_max_suppression(candidates, iou, MAX_DETECTIONS))
    }

    fn class_name(&self, class_id: usize) -> Option<&str> {
        self.class_names.get(class_id).map(String::as_str)
    }

    fn class_count(&self) -> usize {
        self.class_names.len()
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
