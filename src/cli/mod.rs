// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod dataset;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// SkipQ dataset and training tools
#[derive(Parser, Debug)]
#[command(name = "skipq-cli")]
#[command(version)]
#[command(about = "Training-set assembly for the SkipQ detector", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Combine the stationery and grocery sets into a YOLO dataset
    PrepareDataset(dataset::PrepareArgs),

    /// Re-run verification on an assembled dataset
    VerifyDataset(dataset::VerifyArgs),

    /// Print the trainer commands for an assembled dataset
    TrainPlan(dataset::TrainPlanArgs),
}

/// Execute CLI command
pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::PrepareDataset(args) => dataset::prepare(args),
        Commands::VerifyDataset(args) => dataset::verify(args),
        Commands::TrainPlan(args) => dataset::train_plan(args),
    }
}
