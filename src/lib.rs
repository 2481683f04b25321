#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Rock-Paper-Scissors Gesture Library
//!
//! Tooling around a hand-gesture classifier for rock, paper and scissors:
//! dataset download, webcam dataset creation, training dispatch to an
//! external engine and live move detection.
//!
//! ## Features
//!
//! - **Dataset download**: streamed HTTP download with progress bars, optional
//!   SHA-256 verification, zip extraction and folder normalization
//! - **Dataset creation**: webcam capture per move, seeded or random
//!   train/test split, grayscale or Canny edge post-processing
//! - **Training**: hands the dataset and hyperparameters to a training engine
//! - **Detection**: ONNX Runtime inference on webcam frames with a confidence
//!   overlay (enable with `onnx` feature, on by default)
//! - **Webcam**: OpenCV capture and preview windows (enable with `opencv` feature)
//! - **CLI Integration**: interactive menu (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rps_gesture::{AppConfig, DatasetDownloader, NoOpProgressReporter};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::builder().dataset_root("rock_paper_scissors").build()?;
//! let downloader = DatasetDownloader::new(
//!     config.download.clone(),
//!     config.layout(),
//!     Arc::new(NoOpProgressReporter),
//! )?;
//! downloader.download_dataset().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Detection without a webcam
//!
//! Every camera, prompt and model dependency sits behind a trait, so the
//! detection loop can be driven by any `CaptureBackend` and `MovePredictor`.
//! The scripted doubles used here come with the `test-utils` feature:
//!
//! ```rust
//! use rps_gesture::capture::CaptureBackend;
//! use rps_gesture::test_utils::{solid_frame, FixedPredictor, ScriptedBackend};
//! use rps_gesture::{AppConfig, MoveDetector, Prediction};
//!
//! let mut config = AppConfig::default();
//! config.detection.frame_delay_ms = 0;
//!
//! let backend = ScriptedBackend::new(solid_frame(64, 64, [0, 0, 0]))
//!     .with_key_script(vec![vec![Some('q')]]);
//! let mut session = backend.open(0).unwrap();
//! let mut predictor = FixedPredictor::new(vec![Prediction::new("rock", 0.9)]);
//!
//! let stats = MoveDetector::new(&config).run(&mut session, &mut predictor).unwrap();
//! assert_eq!(stats.annotated, 1);
//! ```

pub mod backends;
pub mod capture;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dataset;
pub mod detector;
pub mod download;
pub mod error;
pub mod inference;
pub mod models;
pub mod services;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod tracing_config;
pub mod training;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::load_predictor;
#[cfg(feature = "onnx")]
pub use backends::OnnxPredictor;
pub use capture::{default_backend, Camera, CaptureBackend, CaptureSession, PreviewWindow};
pub use config::{
    AppConfig, AppConfigBuilder, CaptureConfig, DatasetConfig, DatasetSource, DetectionConfig,
    DownloadConfig, EdgeThresholds, PostProcess, TrainingConfig,
};
pub use dataset::{next_image_index, reset_dir, ClassSplit, DatasetCreator};
pub use detector::{DetectionStats, MoveDetector};
pub use download::DatasetDownloader;
pub use error::{Result, RpsError};
pub use inference::{
    best_prediction, format_overlay, overlay_for, LabelMap, MovePredictor, OutputActivation,
};
pub use models::{choose_model_file, list_model_files, ModelFamily, Normalization};
pub use services::{
    create_cli_progress_reporter, ConsolePrompter, LogProgressReporter, NoOpProgressReporter,
    ProgressReporter, ProgressUnit, Prompter,
};
pub use training::{ExternalTrainingEngine, ModelTrainer, TrainingEngine, TrainingParams};
pub use types::{DatasetLayout, Frame, Move, Prediction, Split};
pub use utils::{CropMargins, FramePreprocess, ImagePreprocessor, TensorLayout};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};
