//! Rock-paper-scissors gesture CLI
//!
//! Parses the global options, sets up tracing and runs the interactive menu.

use super::config::CliConfigBuilder;
use super::menu::Shell;
use crate::{
    capture::default_backend,
    config::PostProcess,
    models::ModelFamily,
    services::{create_cli_progress_reporter, ConsolePrompter},
    training::ExternalTrainingEngine,
    tracing_config::init_cli_tracing,
    utils::CropMargins,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Rock-paper-scissors gesture dataset, training and detection tool
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
#[command(name = "rps-gesture")]
pub struct Cli {
    /// Dataset root directory [default: rock_paper_scissors]
    #[arg(long, value_name = "PATH")]
    pub dataset_root: Option<PathBuf>,

    /// Webcam device index [default: 0]
    #[arg(long)]
    pub webcam_index: Option<i32>,

    /// JSON configuration file; command-line options override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Network family (resnet50, squeezenet, inceptionv3, densenet121) [default: resnet50]
    #[arg(short, long)]
    pub model_family: Option<ModelFamily>,

    /// Model file under <dataset-root>/models to use for detection (asked interactively if unset)
    #[arg(long)]
    pub model_file: Option<String>,

    /// Minimum confidence (0-100) before a prediction is drawn [default: 80]
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Fraction of each class used for training (0.0-1.0) [default: 0.7]
    #[arg(long)]
    pub split_ratio: Option<f64>,

    /// Seed for a reproducible train/test split
    #[arg(long)]
    pub split_seed: Option<u64>,

    /// Post-processing after the split (none, grayscale, edge-detect) [default: none]
    #[arg(long)]
    pub post_process: Option<PostProcess>,

    /// Training engine executable [default: rps-train-engine]
    #[arg(long, value_name = "PROGRAM")]
    pub trainer_program: Option<PathBuf>,

    /// Rotate detection frames 90° clockwise
    #[arg(long)]
    pub rotate_clockwise: bool,

    /// Crop detection frames by top,bottom,left,right pixels (e.g. 210,210,30,150)
    #[arg(long, value_name = "T,B,L,R")]
    pub crop: Option<CropMargins>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Main CLI entry point
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid configuration")?;
    log::debug!("Configuration: {:?}", config);

    let backend = default_backend();
    let reporter = create_cli_progress_reporter();
    let mut prompter = ConsolePrompter::stdio();
    let mut engine = ExternalTrainingEngine::from_config(&config.training);

    println!("✊✋✌️  Rock-paper-scissors gesture tool");
    println!("   Dataset: {}", config.dataset.root.display());
    println!("   Model family: {}", config.model_family);

    let shell = Shell::new(config, backend.as_ref(), reporter);
    shell
        .run(&mut prompter, &mut engine)
        .await
        .context("Command failed")?;

    println!("👋 Bye");
    Ok(())
}
