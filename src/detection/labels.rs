// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class-name tables for detection models
//!
//! Names come from, in order of preference: an explicit labels file, the
//! `names` entry the exporter writes into ONNX custom metadata, or the COCO
//! table shipped by the stock YOLOv8 checkpoints.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// COCO class names used by the stock YOLOv8 checkpoints
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

fn names_entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#).expect("valid names regex")
    })
}

/// Parse the exporter's `names` metadata, e.g. `{0: 'person', 1: 'bicycle'}`
///
/// Ids missing from the mapping are filled with `class_<id>`. Returns `None`
/// when no entry can be parsed.
pub fn parse_names_metadata(raw: &str) -> Option<Vec<String>> {
    let mut entries: Vec<(usize, String)> = names_entry_regex()
        .captures_iter(raw)
        .filter_map(|cap| {
            let id = cap.get(1)?.as_str().parse::<usize>().ok()?;
            let name = cap.get(2).or_else(|| cap.get(3))?.as_str().to_string();
            Some((id, name))
        })
        .collect();

    if entries.is_empty() {
        return None;
    }

    entries.sort_by_key(|(id, _)| *id);
    let max_id = entries.last().map(|(id, _)| *id)?;

    let mut names: Vec<String> = (0..=max_id).map(|id| format!("class_{}", id)).collect();
    for (id, name) in entries {
        names[id] = name;
    }
    Some(names)
}

/// Load a labels file with one class name per line (blank lines ignored)
pub fn load_labels_file(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// The COCO table as owned strings
pub fn coco_names() -> Vec<String> {
    COCO_CLASSES.iter().map(|s| s.to_string()).collect()
}
