//! Interactive command menu

use crate::backends::load_predictor;
use crate::capture::CaptureBackend;
use crate::config::AppConfig;
use crate::dataset::DatasetCreator;
use crate::detector::MoveDetector;
use crate::download::DatasetDownloader;
use crate::error::Result;
use crate::inference::MovePredictor;
use crate::services::{ProgressReporter, Prompter};
use crate::tracing_config::spans;
use crate::training::{ModelTrainer, TrainingEngine};
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;

/// Commands offered by the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    DownloadDataset,
    CreateDataset,
    TrainModel,
    DetectMove,
    Exit,
}

impl MenuCommand {
    pub const ALL: [MenuCommand; 5] = [
        MenuCommand::DownloadDataset,
        MenuCommand::CreateDataset,
        MenuCommand::TrainModel,
        MenuCommand::DetectMove,
        MenuCommand::Exit,
    ];

    /// Number typed to select the command
    #[must_use]
    pub fn selection(self) -> i64 {
        match self {
            MenuCommand::DownloadDataset => 1,
            MenuCommand::CreateDataset => 2,
            MenuCommand::TrainModel => 3,
            MenuCommand::DetectMove => 4,
            MenuCommand::Exit => 99,
        }
    }

    #[must_use]
    pub fn from_selection(selection: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.selection() == selection)
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            MenuCommand::DownloadDataset => "Download dataset",
            MenuCommand::CreateDataset => "Create/update dataset",
            MenuCommand::TrainModel => "Train Model",
            MenuCommand::DetectMove => "Detect move from webcam",
            MenuCommand::Exit => "Exit",
        }
    }
}

/// Show the menu until a known command number is entered
pub fn next_command(prompter: &mut dyn Prompter) -> Result<MenuCommand> {
    loop {
        prompter.notify("");
        for command in MenuCommand::ALL {
            prompter.notify(&format!("{}. {}", command.selection(), command.title()));
        }

        let selection = prompter.read_number("Which command?")?;
        match MenuCommand::from_selection(selection) {
            Some(command) => return Ok(command),
            None => prompter.notify("Input a valid command"),
        }
    }
}

type PredictorLoader = fn(&AppConfig, &Path) -> Result<Box<dyn MovePredictor>>;

/// Dispatches menu commands to the dataset, training and detection components
pub struct Shell<'a> {
    config: AppConfig,
    backend: &'a dyn CaptureBackend,
    reporter: Arc<dyn ProgressReporter>,
    predictor_loader: PredictorLoader,
}

impl<'a> Shell<'a> {
    pub fn new(
        config: AppConfig,
        backend: &'a dyn CaptureBackend,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            config,
            backend,
            reporter,
            predictor_loader: load_predictor,
        }
    }

    /// Replace how detection models are loaded
    #[must_use]
    pub fn with_predictor_loader(mut self, loader: PredictorLoader) -> Self {
        self.predictor_loader = loader;
        self
    }

    /// Run the menu loop until Exit
    ///
    /// Missing dataset or model errors are reported and the menu continues;
    /// any other error ends the loop.
    pub async fn run(
        &self,
        prompter: &mut dyn Prompter,
        engine: &mut dyn TrainingEngine,
    ) -> Result<()> {
        loop {
            let command = next_command(prompter)?;
            if command == MenuCommand::Exit {
                return Ok(());
            }

            match self.execute(command, prompter, engine).await {
                Ok(()) => {},
                Err(e) if e.is_recoverable() => {
                    log::warn!("{} failed: {}", command.title(), e);
                    prompter.notify(&format!("❌ {}", e));
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Run a single command
    pub async fn execute(
        &self,
        command: MenuCommand,
        prompter: &mut dyn Prompter,
        engine: &mut dyn TrainingEngine,
    ) -> Result<()> {
        let span = spans::command(command.title());
        match command {
            MenuCommand::DownloadDataset => {
                let downloader = DatasetDownloader::new(
                    self.config.download.clone(),
                    self.config.layout(),
                    Arc::clone(&self.reporter),
                )?;
                downloader.download_dataset().instrument(span).await
            },
            MenuCommand::CreateDataset => {
                let _enter = span.enter();
                let creator = DatasetCreator::new(&self.config, Arc::clone(&self.reporter));
                creator.create_dataset(self.backend, prompter).map(|_| ())
            },
            MenuCommand::TrainModel => {
                let _enter = span.enter();
                let trainer = ModelTrainer::new(
                    self.config.model_family,
                    self.config.layout(),
                    self.config.training.params.clone(),
                )?;
                trainer.train(engine)
            },
            MenuCommand::DetectMove => {
                let _enter = span.enter();
                let detector = MoveDetector::new(&self.config);
                let loader = self.predictor_loader;
                let stats =
                    detector.detect(self.backend, prompter, |path| loader(&self.config, path))?;
                prompter.notify(&format!(
                    "Processed {} frame(s), {} with a confident move",
                    stats.frames, stats.annotated
                ));
                Ok(())
            },
            MenuCommand::Exit => Ok(()),
        }
    }
}
