// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Dataset assembly tests
//!
//! These tests build small synthetic source sets in temp directories and
//! check the assembled layout:
//! - Stationery pairs are split 85/15 and prefixed `stat_`
//! - Stationery images without labels are dropped
//! - Grocery images are capped, prefixed `groc_` and pseudo-labelled
//! - Grocery validation falls back to the tail of the training images
//! - `data.yaml` lists the combined classes and quotes the dataset path
//! - Assembly is deterministic

use skipq_detector::dataset::{
    prepare_dataset, render_data_yaml, verify_dataset, PrepareOptions, DATA_YAML, PSEUDO_LABEL,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper: Write `count` stationery images, labelled unless listed in `unlabelled`
fn stationery_source(root: &Path, count: usize, unlabelled: &[usize]) -> PathBuf {
    let dir = root.join("stationery");
    fs::create_dir_all(&dir).unwrap();
    for i in 0..count {
        fs::write(dir.join(format!("img_{:03}.jpg", i)), b"jpeg").unwrap();
        if !unlabelled.contains(&i) {
            fs::write(
                dir.join(format!("img_{:03}.txt", i)),
                format!("{} 0.5 0.5 0.2 0.3\n", i % 4),
            )
            .unwrap();
        }
    }
    dir
}

/// Helper: Write `count` grocery images (plus a non-jpg that must be ignored)
fn grocery_source(root: &Path, name: &str, count: usize) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    for i in 0..count {
        fs::write(dir.join(format!("{}_{:03}.jpg", name, i)), b"jpeg").unwrap();
    }
    fs::write(dir.join("readme.png"), b"png").unwrap();
    dir
}

fn count_prefixed(dir: &Path, prefix: &str) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(prefix))
        .count()
}

/// Helper: Read the `path:` value back from a double-quoted YAML scalar
fn parse_yaml_path(yaml: &str) -> String {
    let line = yaml.lines().find(|l| l.starts_with("path: ")).unwrap();
    let quoted = &line["path: ".len()..];
    assert!(quoted.len() >= 2 && quoted.starts_with('"') && quoted.ends_with('"'));

    let mut value = String::new();
    let mut chars = quoted[1..quoted.len() - 1].chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            assert_ne!(c, '"', "unescaped quote in {}", line);
            value.push(c);
            continue;
        }
        match chars.next().unwrap() {
            '\\' => value.push('\\'),
            '"' => value.push('"'),
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                value.push(char::from_u32(u32::from_str_radix(&hex, 16).unwrap()).unwrap());
            }
            other => panic!("unknown escape \\{}", other),
        }
    }
    value
}

fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod prepare_dataset_tests {
    use super::*;

    /// Test 1: Stationery split and grocery caps with a validation directory
    #[test]
    fn test_prepare_with_grocery_val_dir() {
        let work = TempDir::new().unwrap();
        let options = PrepareOptions {
            stationery_dir: stationery_source(work.path(), 20, &[]),
            grocery_train_dir: grocery_source(work.path(), "groc_train", 230),
            grocery_val_dir: Some(grocery_source(work.path(), "groc_val", 60)),
            output_dir: work.path().join("dataset"),
        };

        let report = prepare_dataset(&options).unwrap();

        assert_eq!(report.stationery_train, 17);
        assert_eq!(report.stationery_val, 3);
        assert_eq!(report.grocery_train, 200);
        assert_eq!(report.grocery_val, 50);

        let out = &options.output_dir;
        assert_eq!(count_prefixed(&out.join("images/train"), "stat_"), 17);
        assert_eq!(count_prefixed(&out.join("labels/train"), "stat_"), 17);
        assert_eq!(count_prefixed(&out.join("images/val"), "groc_"), 50);
        assert_eq!(count_prefixed(&out.join("labels/val"), "groc_"), 50);

        assert_eq!(report.summary.train_images, 217);
        assert_eq!(report.summary.train_labels, 217);
        assert_eq!(report.summary.val_images, 53);
        assert!(report.summary.is_complete());
    }

    /// Test 2: Unlabelled stationery images are not copied
    #[test]
    fn test_unlabelled_stationery_skipped() {
        let work = TempDir::new().unwrap();
        let options = PrepareOptions {
            stationery_dir: stationery_source(work.path(), 10, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]),
            grocery_train_dir: grocery_source(work.path(), "groc_train", 0),
            grocery_val_dir: None,
            output_dir: work.path().join("dataset"),
        };

        let report = prepare_dataset(&options).unwrap();

        assert_eq!(report.stationery_train, 0);
        assert_eq!(report.stationery_val, 0);
        assert_eq!(report.summary.train_images, 0);
    }

    /// Test 3: Grocery validation comes from the train tail when no val dir
    #[test]
    fn test_grocery_val_from_train_tail() {
        let work = TempDir::new().unwrap();
        let options = PrepareOptions {
            stationery_dir: work.path().join("no-stationery"),
            grocery_train_dir: grocery_source(work.path(), "groc_train", 220),
            grocery_val_dir: Some(work.path().join("missing-val")),
            output_dir: work.path().join("dataset"),
        };

        let report = prepare_dataset(&options).unwrap();

        assert_eq!(report.grocery_train, 200);
        assert_eq!(report.grocery_val, 20);

        let train = sorted_names(&options.output_dir.join("images/train"));
        let val = sorted_names(&options.output_dir.join("images/val"));
        assert!(val.iter().all(|name| !train.contains(name)));
    }

    /// Test 4: Grocery labels carry the pseudo-label and match image stems
    #[test]
    fn test_grocery_pseudo_labels() {
        let work = TempDir::new().unwrap();
        let options = PrepareOptions {
            stationery_dir: work.path().join("no-stationery"),
            grocery_train_dir: grocery_source(work.path(), "shelf", 3),
            grocery_val_dir: None,
            output_dir: work.path().join("dataset"),
        };

        prepare_dataset(&options).unwrap();

        let labels = options.output_dir.join("labels/train");
        assert_eq!(
            sorted_names(&labels),
            vec!["groc_shelf_000.txt", "groc_shelf_001.txt", "groc_shelf_002.txt"]
        );
        let content = fs::read_to_string(labels.join("groc_shelf_001.txt")).unwrap();
        assert_eq!(content, PSEUDO_LABEL);
        assert_eq!(content, "4 0.5 0.5 0.9 0.9\n");
    }

    /// Test 5: data.yaml names the dataset root and the five classes
    #[test]
    fn test_data_yaml_written() {
        let work = TempDir::new().unwrap();
        let options = PrepareOptions {
            stationery_dir: stationery_source(work.path(), 4, &[]),
            grocery_train_dir: grocery_source(work.path(), "groc_train", 2),
            grocery_val_dir: None,
            output_dir: work.path().join("dataset"),
        };

        let report = prepare_dataset(&options).unwrap();
        assert_eq!(report.data_yaml, options.output_dir.join(DATA_YAML));

        let yaml = fs::read_to_string(&report.data_yaml).unwrap();
        let root = fs::canonicalize(&options.output_dir).unwrap();
        assert!(yaml.starts_with(&format!("path: \"{}\"\n", root.display())));
        assert_eq!(parse_yaml_path(&yaml), root.display().to_string());
        assert!(yaml.contains("train: images/train\n"));
        assert!(yaml.contains("val: images/val\n"));
        assert!(yaml.contains("  4: grocery_item\n"));
        assert!(yaml.ends_with("nc: 5\n"));
    }

    /// Test 6: Dataset roots with YAML-significant characters survive data.yaml
    #[test]
    fn test_data_yaml_path_with_comment_and_colon() {
        for root in [
            "/data/run #2/dataset",
            "/data/set: a/dataset",
            "/data/#x: y/\"quoted\"/back\\slash",
        ] {
            let yaml = render_data_yaml(Path::new(root));
            assert_eq!(parse_yaml_path(&yaml), root);
            assert!(yaml.contains("\nnames:\n"));
            assert!(yaml.ends_with("nc: 5\n"));
        }

        let work = TempDir::new().unwrap();
        let options = PrepareOptions {
            stationery_dir: stationery_source(work.path(), 2, &[]),
            grocery_train_dir: grocery_source(work.path(), "groc_train", 1),
            grocery_val_dir: None,
            output_dir: work.path().join("run #2: final"),
        };

        let report = prepare_dataset(&options).unwrap();
        let yaml = fs::read_to_string(&report.data_yaml).unwrap();
        let root = fs::canonicalize(&options.output_dir).unwrap();
        assert_eq!(parse_yaml_path(&yaml), root.display().to_string());
    }

    /// Test 7: Two runs over the same sources produce the same split
    #[test]
    fn test_assembly_is_deterministic() {
        let work = TempDir::new().unwrap();
        let stationery = stationery_source(work.path(), 40, &[]);
        let grocery = grocery_source(work.path(), "groc_train", 30);

        let run = |name: &str| {
            let options = PrepareOptions {
                stationery_dir: stationery.clone(),
                grocery_train_dir: grocery.clone(),
                grocery_val_dir: None,
                output_dir: work.path().join(name),
            };
            prepare_dataset(&options).unwrap();
            sorted_names(&options.output_dir.join("images/val"))
        };

        assert_eq!(run("first"), run("second"));
    }

    /// Test 8: Verification reports training images without labels
    #[test]
    fn test_verify_reports_missing_labels() {
        let work = TempDir::new().unwrap();
        let options = PrepareOptions {
            stationery_dir: stationery_source(work.path(), 4, &[]),
            grocery_train_dir: grocery_source(work.path(), "groc_train", 2),
            grocery_val_dir: None,
            output_dir: work.path().join("dataset"),
        };
        prepare_dataset(&options).unwrap();

        let stray = options.output_dir.join("images/train/stray.jpg");
        fs::write(&stray, b"jpeg").unwrap();

        let summary = verify_dataset(&options.output_dir).unwrap();
        assert_eq!(summary.missing_train_labels, vec!["stray".to_string()]);
    }
}
