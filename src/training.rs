//! Model training dispatch
//!
//! Training itself is delegated to an external engine. This module checks the
//! dataset precondition, tells the engine which network family and data
//! directory to use, and hands over the hyperparameters.

use crate::config::TrainingConfig;
use crate::error::{Result, RpsError};
use crate::models::ModelFamily;
use crate::types::DatasetLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Hyperparameters handed to the training engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub num_classes: usize,
    /// Number of training epochs
    pub num_experiments: u32,
    /// Enable data augmentation
    pub enhance_data: bool,
    pub batch_size: u32,
    pub show_network_summary: bool,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            num_classes: 3,
            num_experiments: 100,
            enhance_data: true,
            batch_size: 16,
            show_network_summary: true,
        }
    }
}

/// A component able to train an image classifier on a folder dataset
pub trait TrainingEngine {
    fn set_model_family(&mut self, family: ModelFamily) -> Result<()>;

    /// Directory holding the `train/` and `test/` subsets
    fn set_data_directory(&mut self, dir: &Path) -> Result<()>;

    /// Train and write model artifacts below the data directory
    fn train(&mut self, params: &TrainingParams) -> Result<()>;
}

/// Checks the dataset and drives a `TrainingEngine`
#[derive(Debug)]
pub struct ModelTrainer {
    family: ModelFamily,
    layout: DatasetLayout,
    params: TrainingParams,
}

impl ModelTrainer {
    /// Create a trainer for the dataset at `layout`
    ///
    /// # Errors
    /// - `DatasetNotFound` when the dataset root does not exist
    pub fn new(family: ModelFamily, layout: DatasetLayout, params: TrainingParams) -> Result<Self> {
        if !layout.root().is_dir() {
            return Err(RpsError::DatasetNotFound(layout.root().to_path_buf()));
        }
        Ok(Self {
            family,
            layout,
            params,
        })
    }

    pub fn train(&self, engine: &mut dyn TrainingEngine) -> Result<()> {
        let span =
            crate::tracing_config::spans::training(self.family.engine_name(), self.layout.root());
        let _enter = span.enter();

        engine.set_model_family(self.family)?;
        engine.set_data_directory(self.layout.root())?;

        log::info!(
            "🏋️ Training {} for {} experiments (batch size {})",
            self.family,
            self.params.num_experiments,
            self.params.batch_size
        );
        engine.train(&self.params)?;
        log::info!("✅ Training finished, models are in {}", self.layout.models_dir().display());
        Ok(())
    }
}

/// Engine running a trainer executable
///
/// The program receives the family and hyperparameters as arguments and
/// inherits the terminal so its own progress output stays visible.
#[derive(Debug, Clone)]
pub struct ExternalTrainingEngine {
    program: PathBuf,
    base_args: Vec<String>,
    model_type: Option<&'static str>,
    data_dir: Option<PathBuf>,
}

impl ExternalTrainingEngine {
    pub fn new<P: Into<PathBuf>>(program: P, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
            model_type: None,
            data_dir: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    /// Full argument list for a training run
    pub fn command_args(&self, params: &TrainingParams) -> Result<Vec<String>> {
        let model_type = self
            .model_type
            .ok_or_else(|| RpsError::training("model family was not set"))?;
        let data_dir = self
            .data_dir
            .as_ref()
            .ok_or_else(|| RpsError::training("data directory was not set"))?;

        let mut args = self.base_args.clone();
        args.extend([
            "--model-type".to_string(),
            model_type.to_string(),
            "--data-dir".to_string(),
            data_dir.display().to_string(),
            "--num-objects".to_string(),
            params.num_classes.to_string(),
            "--num-experiments".to_string(),
            params.num_experiments.to_string(),
            "--batch-size".to_string(),
            params.batch_size.to_string(),
        ]);
        if params.enhance_data {
            args.push("--enhance-data".to_string());
        }
        if params.show_network_summary {
            args.push("--show-network-summary".to_string());
        }
        Ok(args)
    }
}

impl TrainingEngine for ExternalTrainingEngine {
    fn set_model_family(&mut self, family: ModelFamily) -> Result<()> {
        self.model_type = Some(family.engine_name());
        Ok(())
    }

    fn set_data_directory(&mut self, dir: &Path) -> Result<()> {
        self.data_dir = Some(dir.to_path_buf());
        Ok(())
    }

    fn train(&mut self, params: &TrainingParams) -> Result<()> {
        let args = self.command_args(params)?;
        log::debug!("Running {} {}", self.program.display(), args.join(" "));

        let status = Command::new(&self.program).args(&args).status().map_err(|e| {
            RpsError::training(format!(
                "failed to start trainer '{}': {}",
                self.program.display(),
                e
            ))
        })?;

        if !status.success() {
            return Err(RpsError::training(format!(
                "trainer '{}' exited with {}",
                self.program.display(),
                status
            )));
        }
        Ok(())
    }
}
