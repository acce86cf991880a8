// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::dataset::{
    prepare_dataset, verify_dataset, DatasetSummary, PrepareOptions, TrainingPlan, DATA_YAML,
};

/// Arguments for prepare-dataset command
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Stationery images with YOLO label files alongside
    #[arg(long, env = "STATIONERY_DIR")]
    pub stationery: PathBuf,

    /// Grocery training images (unlabelled)
    #[arg(long, env = "GROCERY_TRAIN_DIR")]
    pub grocery_train: PathBuf,

    /// Grocery validation images (defaults to the tail of the training set)
    #[arg(long, env = "GROCERY_VAL_DIR")]
    pub grocery_val: Option<PathBuf>,

    /// Dataset root to create
    #[arg(long, default_value = "ml/dataset")]
    pub output: PathBuf,
}

/// Arguments for verify-dataset command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Dataset root to check
    #[arg(long, default_value = "ml/dataset")]
    pub output: PathBuf,
}

/// Arguments for train-plan command
#[derive(Args, Debug)]
pub struct TrainPlanArgs {
    /// Dataset root containing data.yaml
    #[arg(long, default_value = "ml/dataset")]
    pub output: PathBuf,

    /// Directory the trainer writes runs into
    #[arg(long, default_value = "ml/runs")]
    pub project: PathBuf,

    /// Pretrained checkpoint to start from
    #[arg(long, default_value = "yolov8n.pt")]
    pub base_model: String,

    #[arg(long, default_value_t = 50)]
    pub epochs: u32,
}

fn print_summary(summary: &DatasetSummary) {
    println!("   Training images:   {}", summary.train_images);
    println!("   Training labels:   {}", summary.train_labels);
    println!("   Validation images: {}", summary.val_images);
    println!("   Validation labels: {}", summary.val_labels);
    if summary.is_complete() {
        println!("✅ All training images have corresponding labels");
    } else {
        println!(
            "⚠️  {} training images missing labels",
            summary.missing_train_labels.len()
        );
    }
}

/// Assemble the combined dataset
pub fn prepare(args: PrepareArgs) -> Result<()> {
    println!("📦 Preparing dataset in {}", args.output.display());

    let options = PrepareOptions {
        stationery_dir: args.stationery,
        grocery_train_dir: args.grocery_train,
        grocery_val_dir: args.grocery_val,
        output_dir: args.output.clone(),
    };
    let report = prepare_dataset(&options).context("Dataset preparation failed")?;

    println!(
        "   Stationery: {} train / {} val",
        report.stationery_train, report.stationery_val
    );
    println!(
        "   Grocery:    {} train / {} val (pseudo-labelled)",
        report.grocery_train, report.grocery_val
    );
    print_summary(&report.summary);
    println!("📝 Data YAML: {}", report.data_yaml.display());
    println!();
    println!("Next step: skipq-cli train-plan --output {}", args.output.display());
    Ok(())
}

/// Verify an existing dataset
pub fn verify(args: VerifyArgs) -> Result<()> {
    println!("🔍 Verifying dataset in {}", args.output.display());
    let summary = verify_dataset(&args.output).context("Dataset verification failed")?;
    print_summary(&summary);
    Ok(())
}

/// Print trainer commands for an assembled dataset
pub fn train_plan(args: TrainPlanArgs) -> Result<()> {
    let data_yaml = args.output.join(DATA_YAML);
    if !data_yaml.is_file() {
        return Err(anyhow!(
            "{} not found. Run prepare-dataset first",
            data_yaml.display()
        ));
    }

    let mut plan = TrainingPlan::new(data_yaml, args.project);
    plan.base_model = args.base_model;
    plan.epochs = args.epochs;

    println!("🏋️ Train:    {}", plan.train_command().join(" "));
    println!("📊 Validate: {}", plan.validate_command().join(" "));
    println!("📤 Export:   {}", plan.export_command().join(" "));
    println!();
    println!("Exported model: {}", plan.exported_model().display());
    Ok(())
}
