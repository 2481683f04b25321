//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{AppConfig, AppConfigBuilder};
use crate::utils::FramePreprocess;
use anyhow::{Context, Result};

/// Convert CLI arguments to an `AppConfig`
pub struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from the config file (or defaults) and apply the command-line overrides
    pub fn from_cli(cli: &Cli) -> Result<AppConfig> {
        let base = match &cli.config {
            Some(path) => AppConfig::from_json_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => AppConfig::default(),
        };

        let preprocess = FramePreprocess {
            rotate_clockwise: cli.rotate_clockwise || base.detection.preprocess.rotate_clockwise,
            crop: cli.crop.or(base.detection.preprocess.crop),
        };
        let split_seed = cli.split_seed.or(base.dataset.split_seed);
        let model_file = cli.model_file.clone().or_else(|| base.detection.model_file.clone());

        let mut builder = AppConfigBuilder::from_config(base)
            .frame_preprocess(preprocess)
            .split_seed(split_seed)
            .model_file(model_file);

        if let Some(root) = &cli.dataset_root {
            builder = builder.dataset_root(root.clone());
        }
        if let Some(index) = cli.webcam_index {
            builder = builder.webcam_index(index);
        }
        if let Some(family) = cli.model_family {
            builder = builder.model_family(family);
        }
        if let Some(threshold) = cli.threshold {
            builder = builder.threshold(threshold);
        }
        if let Some(ratio) = cli.split_ratio {
            builder = builder.train_test_split(ratio);
        }
        if let Some(post_process) = cli.post_process {
            builder = builder.post_process(post_process);
        }
        if let Some(program) = &cli.trainer_program {
            builder = builder.trainer_program(program.clone());
        }

        builder.build().context("Invalid command-line options")
    }
}
