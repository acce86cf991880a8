// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model resolver tests
//!
//! These tests verify that the resolver:
//! - Picks the first candidate that exists, is large enough and loads
//! - Never attempts candidates at or below the size threshold
//! - Moves on when a candidate fails to load
//! - Falls back unconditionally when nothing qualifies
//! - Fails only when the fallback itself cannot be loaded
//!
//! Candidate files are sparse temp files sized around the threshold; a
//! recording loader stands in for ONNX Runtime.

use image::DynamicImage;
use skipq_detector::detection::{
    DetectorError, LoadError, ModelLoader, ModelResolver, ObjectDetector, RawDetection,
    ResolveError, ResolverConfig,
};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const THRESHOLD: u64 = 1_000_000;

struct PathDetector {
    name: String,
}

impl ObjectDetector for PathDetector {
    fn detect(
        &self,
        _image: &DynamicImage,
        _confidence: f32,
        _iou: f32,
    ) -> Result<Vec<RawDetection>, DetectorError> {
        Ok(Vec::new())
    }

    fn class_name(&self, _class_id: usize) -> Option<&str> {
        None
    }

    fn class_count(&self) -> usize {
        0
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Loader that records every attempt and fails for configured paths
#[derive(Clone, Default)]
struct RecordingLoader {
    attempts: Arc<Mutex<Vec<PathBuf>>>,
    failing: Arc<HashSet<PathBuf>>,
}

impl RecordingLoader {
    fn failing_on(paths: &[&Path]) -> Self {
        Self {
            attempts: Arc::default(),
            failing: Arc::new(paths.iter().map(|p| p.to_path_buf()).collect()),
        }
    }

    fn attempts(&self) -> Vec<PathBuf> {
        self.attempts.lock().unwrap().clone()
    }
}

impl ModelLoader for RecordingLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ObjectDetector>, LoadError> {
        self.attempts.lock().unwrap().push(path.to_path_buf());
        if self.failing.contains(path) {
            return Err(LoadError::new(path, "corrupt artifact"));
        }
        Ok(Arc::new(PathDetector {
            name: path.display().to_string(),
        }))
    }
}

/// Helper: Create a file of exactly `len` bytes
fn sized_file(dir: &TempDir, name: &str, len: u64) -> PathBuf {
    let path = dir.path().join(name);
    File::create(&path).unwrap().set_len(len).unwrap();
    path
}

fn config(candidates: Vec<PathBuf>, fallback: PathBuf) -> ResolverConfig {
    ResolverConfig {
        candidates,
        min_model_bytes: THRESHOLD,
        fallback_model: fallback,
    }
}

#[cfg(test)]
mod resolver_tests {
    use super::*;

    /// Test 1: First qualifying candidate wins and later ones are untouched
    #[test]
    fn test_first_qualifying_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let a = sized_file(&dir, "a.onnx", THRESHOLD + 1);
        let b = sized_file(&dir, "b.onnx", 5 * THRESHOLD);
        let fallback = dir.path().join("fallback.onnx");

        let loader = RecordingLoader::default();
        let resolver = ModelResolver::new(config(vec![a.clone(), b], fallback), loader.clone());
        let resolved = resolver.resolve().unwrap();

        assert_eq!(resolved.source, a);
        assert!(!resolved.is_fallback);
        assert_eq!(loader.attempts(), vec![a]);
    }

    /// Test 2: Files at or below the threshold are skipped without loading
    #[test]
    fn test_small_files_never_loaded() {
        let dir = TempDir::new().unwrap();
        let exact = sized_file(&dir, "exact.onnx", THRESHOLD);
        let tiny = sized_file(&dir, "tiny.onnx", 10);
        let good = sized_file(&dir, "good.onnx", THRESHOLD + 1);
        let fallback = dir.path().join("fallback.onnx");

        let loader = RecordingLoader::default();
        let resolver = ModelResolver::new(
            config(vec![exact, tiny, good.clone()], fallback),
            loader.clone(),
        );
        let resolved = resolver.resolve().unwrap();

        assert_eq!(resolved.source, good);
        assert_eq!(loader.attempts(), vec![good]);
    }

    /// Test 3: Missing candidates and directories are skipped
    #[test]
    fn test_missing_and_directory_candidates_skipped() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.onnx");
        let subdir = dir.path().join("weights");
        std::fs::create_dir(&subdir).unwrap();
        let good = sized_file(&dir, "good.onnx", 2 * THRESHOLD);

        let loader = RecordingLoader::default();
        let resolver = ModelResolver::new(
            config(vec![missing, subdir, good.clone()], dir.path().join("fb.onnx")),
            loader.clone(),
        );

        assert_eq!(resolver.resolve().unwrap().source, good);
        assert_eq!(loader.attempts(), vec![good]);
    }

    /// Test 4: A candidate that fails to load is passed over
    #[test]
    fn test_load_failure_moves_to_next_candidate() {
        let dir = TempDir::new().unwrap();
        let broken = sized_file(&dir, "broken.onnx", 2 * THRESHOLD);
        let good = sized_file(&dir, "good.onnx", 2 * THRESHOLD);

        let loader = RecordingLoader::failing_on(&[&broken]);
        let resolver = ModelResolver::new(
            config(vec![broken.clone(), good.clone()], dir.path().join("fb.onnx")),
            loader.clone(),
        );
        let resolved = resolver.resolve().unwrap();

        assert_eq!(resolved.source, good);
        assert!(!resolved.is_fallback);
        assert_eq!(loader.attempts(), vec![broken, good]);
    }

    /// Test 5: Fallback is loaded without any existence or size check
    #[test]
    fn test_fallback_loaded_unconditionally() {
        let dir = TempDir::new().unwrap();
        let small = sized_file(&dir, "small.onnx", 100);
        let fallback = PathBuf::from("yolov8n.onnx");

        let loader = RecordingLoader::default();
        let resolver = ModelResolver::new(config(vec![small], fallback.clone()), loader.clone());
        let resolved = resolver.resolve().unwrap();

        assert!(resolved.is_fallback);
        assert_eq!(resolved.source, fallback);
        assert_eq!(resolved.detector.name(), "yolov8n.onnx");
        assert_eq!(loader.attempts(), vec![fallback]);
    }

    /// Test 6: Every candidate failing to load ends on the fallback
    #[test]
    fn test_all_candidates_fail_then_fallback() {
        let dir = TempDir::new().unwrap();
        let a = sized_file(&dir, "a.onnx", 2 * THRESHOLD);
        let b = sized_file(&dir, "b.onnx", 2 * THRESHOLD);
        let fallback = dir.path().join("fb.onnx");

        let loader = RecordingLoader::failing_on(&[&a, &b]);
        let resolver = ModelResolver::new(
            config(vec![a.clone(), b.clone()], fallback.clone()),
            loader.clone(),
        );
        let resolved = resolver.resolve().unwrap();

        assert!(resolved.is_fallback);
        assert_eq!(loader.attempts(), vec![a, b, fallback]);
    }

    /// Test 7: Fallback failure is fatal
    #[test]
    fn test_fallback_failure_is_fatal() {
        let fallback = PathBuf::from("/nonexistent/yolov8n.onnx");
        let loader = RecordingLoader::failing_on(&[&fallback]);
        let resolver = ModelResolver::new(config(vec![], fallback.clone()), loader);

        match resolver.resolve() {
            Err(ResolveError::FallbackFailed { path, reason }) => {
                assert_eq!(path, fallback);
                assert_eq!(reason, "corrupt artifact");
            }
            Ok(model) => panic!("expected failure, resolved {:?}", model),
        }
    }

    /// Test 8: Eligibility follows the strict size threshold
    #[test]
    fn test_is_eligible() {
        let dir = TempDir::new().unwrap();
        let resolver = ModelResolver::new(
            config(vec![], PathBuf::from("fb.onnx")),
            RecordingLoader::default(),
        );

        assert!(!resolver.is_eligible(&sized_file(&dir, "eq.onnx", THRESHOLD)));
        assert!(resolver.is_eligible(&sized_file(&dir, "gt.onnx", THRESHOLD + 1)));
        assert!(!resolver.is_eligible(&dir.path().join("nope.onnx")));
        assert!(!resolver.is_eligible(dir.path()));
    }
}
