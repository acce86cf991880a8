// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Dataset assembly

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::verify::{verify_dataset, DatasetSummary};
use super::{
    DatasetError, Split, COMBINED_CLASSES, DATA_YAML, GROCERY_EXTENSIONS, GROCERY_PREFIX,
    MAX_GROCERY_TRAIN, MAX_GROCERY_VAL, PSEUDO_LABEL, SHUFFLE_SEED, STATIONERY_EXTENSIONS,
    STATIONERY_PREFIX, TRAIN_RATIO,
};

/// Source and destination directories for one assembly run
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Stationery images with YOLO `.txt` labels side by side
    pub stationery_dir: PathBuf,
    /// Unlabelled grocery training images
    pub grocery_train_dir: PathBuf,
    /// Unlabelled grocery validation images; when absent the validation
    /// split is taken from the unused tail of the training images
    pub grocery_val_dir: Option<PathBuf>,
    /// Dataset root to create
    pub output_dir: PathBuf,
}

/// Counts of copied items plus the post-assembly verification
#[derive(Debug, Clone)]
pub struct PrepareReport {
    pub stationery_train: usize,
    pub stationery_val: usize,
    pub grocery_train: usize,
    pub grocery_val: usize,
    pub data_yaml: PathBuf,
    pub summary: DatasetSummary,
}

/// Build the combined dataset under `options.output_dir`
pub fn prepare_dataset(options: &PrepareOptions) -> Result<PrepareReport, DatasetError> {
    let root = &options.output_dir;
    create_layout(root)?;

    let (stationery_train, stationery_val) = copy_stationery(&options.stationery_dir, root)?;
    let (grocery_train, grocery_val) = copy_grocery(
        &options.grocery_train_dir,
        options.grocery_val_dir.as_deref(),
        root,
    )?;

    let data_yaml = write_data_yaml(root)?;
    let summary = verify_dataset(root)?;

    Ok(PrepareReport {
        stationery_train,
        stationery_val,
        grocery_train,
        grocery_val,
        data_yaml,
        summary,
    })
}

/// Create `images/{train,val}` and `labels/{train,val}`
pub fn create_layout(root: &Path) -> Result<(), DatasetError> {
    for split in [Split::Train, Split::Val] {
        for dir in [split.images_dir(root), split.labels_dir(root)] {
            fs::create_dir_all(&dir).map_err(|e| DatasetError::io(&dir, e))?;
        }
    }
    debug!("Dataset layout created under {}", root.display());
    Ok(())
}

/// Files directly inside `dir` with one of `extensions`, sorted by name
///
/// A missing directory yields an empty list.
pub fn list_images(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, DatasetError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Source directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(DatasetError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DatasetError::io(dir, e))?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.contains(&ext))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Shuffle with a fresh RNG seeded from [`SHUFFLE_SEED`]
pub fn seeded_shuffle<T>(items: &mut [T]) {
    let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);
    items.shuffle(&mut rng);
}

/// Number of items going to the training split
pub fn train_split_index(len: usize) -> usize {
    (len as f64 * TRAIN_RATIO) as usize
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn copy_file(from: &Path, to: &Path) -> Result<(), DatasetError> {
    fs::copy(from, to).map_err(|e| DatasetError::io(from, e))?;
    Ok(())
}

/// Copy image/label pairs for one split; images without a label are skipped
fn copy_labelled(files: &[PathBuf], root: &Path, split: Split) -> Result<usize, DatasetError> {
    let mut copied = 0;
    for image in files {
        let label = image.with_extension("txt");
        if !label.is_file() {
            debug!("Skipping {}: no label file", image.display());
            continue;
        }

        let image_dest = split
            .images_dir(root)
            .join(format!("{}{}", STATIONERY_PREFIX, file_name(image)));
        let label_dest = split
            .labels_dir(root)
            .join(format!("{}{}", STATIONERY_PREFIX, file_name(&label)));

        copy_file(image, &image_dest)?;
        copy_file(&label, &label_dest)?;
        copied += 1;
    }
    Ok(copied)
}

/// Shuffle, split 85/15 and copy the labelled stationery set
pub fn copy_stationery(source: &Path, root: &Path) -> Result<(usize, usize), DatasetError> {
    let mut images = list_images(source, STATIONERY_EXTENSIONS)?;
    info!("Found {} stationery images", images.len());

    seeded_shuffle(&mut images);
    let split_at = train_split_index(images.len());
    let (train, val) = images.split_at(split_at);

    let copied_train = copy_labelled(train, root, Split::Train)?;
    let copied_val = copy_labelled(val, root, Split::Val)?;

    info!(
        "Copied {} stationery training pairs, {} validation pairs",
        copied_train, copied_val
    );
    Ok((copied_train, copied_val))
}

/// Write the pseudo-label for one grocery image
pub fn write_pseudo_label(path: &Path) -> Result<(), DatasetError> {
    fs::write(path, PSEUDO_LABEL).map_err(|e| DatasetError::io(path, e))
}

fn copy_pseudo_labelled(
    files: &[PathBuf],
    root: &Path,
    split: Split,
) -> Result<usize, DatasetError> {
    for image in files {
        let image_dest = split
            .images_dir(root)
            .join(format!("{}{}", GROCERY_PREFIX, file_name(image)));
        let label_dest = split
            .labels_dir(root)
            .join(format!("{}{}.txt", GROCERY_PREFIX, file_stem(image)));

        copy_file(image, &image_dest)?;
        write_pseudo_label(&label_dest)?;
    }
    Ok(files.len())
}

/// Copy a capped, shuffled selection of grocery images with pseudo-labels
///
/// Validation images come from `val_source` when that directory exists,
/// otherwise from the shuffled training images just past the training cap.
pub fn copy_grocery(
    train_source: &Path,
    val_source: Option<&Path>,
    root: &Path,
) -> Result<(usize, usize), DatasetError> {
    let mut train_images = list_images(train_source, GROCERY_EXTENSIONS)?;
    info!("Found {} grocery training images", train_images.len());

    seeded_shuffle(&mut train_images);
    let train_count = train_images.len().min(MAX_GROCERY_TRAIN);

    let val_images = match val_source {
        Some(dir) if dir.is_dir() => list_images(dir, GROCERY_EXTENSIONS)?,
        _ => {
            let end = (train_count + MAX_GROCERY_VAL).min(train_images.len());
            train_images[train_count..end].to_vec()
        }
    };
    let val_count = val_images.len().min(MAX_GROCERY_VAL);

    let copied_train = copy_pseudo_labelled(&train_images[..train_count], root, Split::Train)?;
    let copied_val = copy_pseudo_labelled(&val_images[..val_count], root, Split::Val)?;

    info!(
        "Copied {} grocery training images, {} validation images (pseudo-labelled)",
        copied_train, copied_val
    );
    Ok((copied_train, copied_val))
}

/// Quote a string as a YAML double-quoted scalar
///
/// Paths may contain `#`, `: ` or quotes, any of which would change the
/// meaning of a plain scalar.
pub fn yaml_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(quoted, "\\u{:04X}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Render `data.yaml` for a dataset rooted at `root`
pub fn render_data_yaml(root: &Path) -> String {
    let mut yaml = String::new();
    let _ = writeln!(yaml, "path: {}", yaml_quote(&root.display().to_string()));
    let _ = writeln!(yaml, "train: images/train");
    let _ = writeln!(yaml, "val: images/val");
    let _ = writeln!(yaml, "names:");
    for (id, name) in COMBINED_CLASSES.iter().enumerate() {
        let _ = writeln!(yaml, "  {}: {}", id, name);
    }
    let _ = writeln!(yaml, "nc: {}", COMBINED_CLASSES.len());
    yaml
}

/// Write `data.yaml` with the absolute dataset path
pub fn write_data_yaml(root: &Path) -> Result<PathBuf, DatasetError> {
    let absolute = fs::canonicalize(root).map_err(|e| DatasetError::io(root, e))?;
    let path = root.join(DATA_YAML);
    fs::write(&path, render_data_yaml(&absolute)).map_err(|e| DatasetError::io(&path, e))?;
    info!("Created {}", path.display());
    Ok(path)
}
