//! Configuration types for the dataset, training and detection commands

use crate::error::{Result, RpsError};
use crate::inference::OutputActivation;
use crate::models::ModelFamily;
use crate::training::TrainingParams;
use crate::types::DatasetLayout;
use crate::utils::{FramePreprocess, TensorLayout};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default public training archive
pub const DEFAULT_TRAIN_URL: &str =
    "https://storage.googleapis.com/laurencemoroney-blog.appspot.com/rps.zip";

/// Default public test archive
pub const DEFAULT_TEST_URL: &str =
    "https://storage.googleapis.com/laurencemoroney-blog.appspot.com/rps-test-set.zip";

/// Optional in-place transform applied after the train/test split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PostProcess {
    #[default]
    None,
    Grayscale,
    EdgeDetect,
}

impl std::str::FromStr for PostProcess {
    type Err = RpsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "grayscale" | "gray" => Ok(Self::Grayscale),
            "edge-detect" | "edges" | "canny" => Ok(Self::EdgeDetect),
            other => Err(RpsError::invalid_config(format!(
                "Unknown post-processing '{}'. Expected none, grayscale or edge-detect",
                other
            ))),
        }
    }
}

/// Canny hysteresis thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeThresholds {
    pub threshold1: f64,
    pub threshold2: f64,
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        Self {
            threshold1: 100.0,
            threshold2: 50.0,
        }
    }
}

/// Dataset location and split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dataset root directory
    pub root: PathBuf,
    /// Fraction of each class assigned to the training subset
    pub train_test_split: f64,
    /// Seed for the split sampler (None = OS entropy)
    pub split_seed: Option<u64>,
    /// Post-processing run after the split
    pub post_process: PostProcess,
    pub edge_thresholds: EdgeThresholds,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("rock_paper_scissors"),
            train_test_split: 0.7,
            split_seed: None,
            post_process: PostProcess::None,
            edge_thresholds: EdgeThresholds::default(),
        }
    }
}

/// One downloadable archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSource {
    pub url: String,
    /// Expected SHA-256 of the archive (hex); skipped when absent
    #[serde(default)]
    pub sha256: Option<String>,
}

impl DatasetSource {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            sha256: None,
        }
    }

    /// Archive file name: the last URL path segment
    #[must_use]
    pub fn archive_name(&self) -> &str {
        let without_query = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        without_query
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("dataset.zip")
    }

    /// Folder name the archive extracts to: the archive name without extension
    #[must_use]
    pub fn extracted_dir_name(&self) -> &str {
        let name = self.archive_name();
        Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
    }
}

/// Dataset download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub train: DatasetSource,
    pub test: DatasetSource,
    /// Streaming chunk size in bytes
    pub chunk_size: usize,
    /// Directory receiving the temporary archives
    pub archive_dir: PathBuf,
    /// Pause before the extraction loop, in milliseconds
    pub extract_delay_ms: u64,
    /// Whole-request timeout in seconds (None = wait indefinitely)
    pub request_timeout_secs: Option<u64>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            train: DatasetSource::new(DEFAULT_TRAIN_URL),
            test: DatasetSource::new(DEFAULT_TEST_URL),
            chunk_size: 4096,
            archive_dir: PathBuf::from("."),
            extract_delay_ms: 1000,
            request_timeout_secs: None,
        }
    }
}

impl DownloadConfig {
    #[must_use]
    pub fn extract_delay(&self) -> Duration {
        Duration::from_millis(self.extract_delay_ms)
    }
}

/// Webcam capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub webcam_index: i32,
    pub capture_key: char,
    pub quit_key: char,
    pub frame_delay_ms: u64,
    pub window_title: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            webcam_index: 0,
            capture_key: ' ',
            quit_key: 'q',
            frame_delay_ms: 200,
            window_title: "Frame".to_string(),
        }
    }
}

impl CaptureConfig {
    #[must_use]
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

/// External training engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub params: TrainingParams,
    /// Trainer executable
    pub program: PathBuf,
    /// Arguments placed before the generated ones
    pub args: Vec<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            params: TrainingParams::default(),
            program: PathBuf::from("rps-train-engine"),
            args: Vec::new(),
        }
    }
}

/// Live detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Model file under `<root>/models` (None = ask interactively)
    pub model_file: Option<String>,
    /// Label map file under `<root>/json`
    pub label_map_file: String,
    pub num_classes: usize,
    /// Minimum confidence (0-100) required to draw the overlay
    pub threshold: f32,
    pub frame_delay_ms: u64,
    pub preprocess: FramePreprocess,
    pub tensor_layout: TensorLayout,
    pub output_activation: OutputActivation,
    /// Intra-op threads for inference (0 = auto)
    pub intra_threads: usize,
    pub window_title: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_file: None,
            label_map_file: DatasetLayout::LABEL_MAP_FILE.to_string(),
            num_classes: 3,
            threshold: 80.0,
            frame_delay_ms: 200,
            preprocess: FramePreprocess::default(),
            tensor_layout: TensorLayout::default(),
            output_activation: OutputActivation::default(),
            intra_threads: 0,
            window_title: "Move predictor".to_string(),
        }
    }
}

impl DetectionConfig {
    #[must_use]
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Network family shared by training and detection
    pub model_family: ModelFamily,
    pub dataset: DatasetConfig,
    pub download: DownloadConfig,
    pub capture: CaptureConfig,
    pub training: TrainingConfig,
    pub detection: DetectionConfig,
}

impl AppConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use rps_gesture::{AppConfig, ModelFamily};
    ///
    /// let config = AppConfig::builder()
    ///     .dataset_root("my_dataset")
    ///     .model_family(ModelFamily::DenseNet121)
    ///     .threshold(90.0)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.detection.threshold, 90.0);
    /// ```
    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RpsError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            RpsError::invalid_config(format!("{} is not a valid config: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn layout(&self) -> DatasetLayout {
        DatasetLayout::new(self.dataset.root.clone())
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Split ratio outside 0.0-1.0
    /// - Detection threshold outside 0-100
    /// - Zero batch size, experiment count, class count or chunk size
    /// - Empty dataset root or archive URL
    /// - Capture and quit keys bound to the same character
    pub fn validate(&self) -> Result<()> {
        if self.dataset.root.as_os_str().is_empty() {
            return Err(RpsError::invalid_config("Dataset root cannot be empty"));
        }

        let ratio = self.dataset.train_test_split;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(RpsError::config_value_error(
                "train/test split ratio",
                ratio,
                "0.0-1.0",
                Some(0.7),
            ));
        }

        let threshold = self.detection.threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(RpsError::config_value_error(
                "detection threshold",
                threshold,
                "0-100",
                Some(80.0),
            ));
        }

        let params = &self.training.params;
        if params.batch_size == 0 {
            return Err(RpsError::config_value_error(
                "batch size",
                params.batch_size,
                ">= 1",
                Some(16),
            ));
        }
        if params.num_experiments == 0 {
            return Err(RpsError::config_value_error(
                "number of experiments",
                params.num_experiments,
                ">= 1",
                Some(100),
            ));
        }
        if params.num_classes == 0 || self.detection.num_classes == 0 {
            return Err(RpsError::invalid_config("Number of classes must be at least 1"));
        }

        if self.download.chunk_size == 0 {
            return Err(RpsError::config_value_error(
                "chunk size",
                self.download.chunk_size,
                ">= 1",
                Some(4096),
            ));
        }
        for source in [&self.download.train, &self.download.test] {
            if source.url.trim().is_empty() {
                return Err(RpsError::invalid_config(
                    "Train and test dataset urls are required",
                ));
            }
        }

        if self.capture.capture_key == self.capture.quit_key {
            return Err(RpsError::invalid_config(format!(
                "Capture and quit keys must differ (both are '{}')",
                self.capture.quit_key
            )));
        }

        self.detection.preprocess.validate()?;

        Ok(())
    }
}

/// Builder for `AppConfig`
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from disk)
    #[must_use]
    pub fn from_config(config: AppConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn dataset_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.config.dataset.root = root.into();
        self
    }

    #[must_use]
    pub fn model_family(mut self, family: ModelFamily) -> Self {
        self.config.model_family = family;
        self
    }

    #[must_use]
    pub fn webcam_index(mut self, index: i32) -> Self {
        self.config.capture.webcam_index = index;
        self
    }

    #[must_use]
    pub fn train_test_split(mut self, ratio: f64) -> Self {
        self.config.dataset.train_test_split = ratio;
        self
    }

    #[must_use]
    pub fn split_seed(mut self, seed: Option<u64>) -> Self {
        self.config.dataset.split_seed = seed;
        self
    }

    #[must_use]
    pub fn post_process(mut self, post_process: PostProcess) -> Self {
        self.config.dataset.post_process = post_process;
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.config.detection.threshold = threshold;
        self
    }

    #[must_use]
    pub fn model_file<S: Into<String>>(mut self, model_file: Option<S>) -> Self {
        self.config.detection.model_file = model_file.map(Into::into);
        self
    }

    #[must_use]
    pub fn frame_preprocess(mut self, preprocess: FramePreprocess) -> Self {
        self.config.detection.preprocess = preprocess;
        self
    }

    #[must_use]
    pub fn trainer_program<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.config.training.program = program.into();
        self
    }

    #[must_use]
    pub fn training_params(mut self, params: TrainingParams) -> Self {
        self.config.training.params = params;
        self
    }

    #[must_use]
    pub fn download_sources(mut self, train: DatasetSource, test: DatasetSource) -> Self {
        self.config.download.train = train;
        self.config.download.test = test;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::CropMargins;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.dataset.root, PathBuf::from("rock_paper_scissors"));
        assert!((config.dataset.train_test_split - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.download.chunk_size, 4096);
        assert_eq!(config.capture.quit_key, 'q');
        assert!((config.detection.threshold - 80.0).abs() < f32::EPSILON);
        assert_eq!(config.training.params.batch_size, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_archive_names() {
        let source = DatasetSource::new(DEFAULT_TEST_URL);
        assert_eq!(source.archive_name(), "rps-test-set.zip");
        assert_eq!(source.extracted_dir_name(), "rps-test-set");

        let source = DatasetSource::new("https://example.com/data/rps.zip?download=1");
        assert_eq!(source.archive_name(), "rps.zip");
        assert_eq!(source.extracted_dir_name(), "rps");
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let err = AppConfig::builder().train_test_split(1.5).build().unwrap_err();
        assert!(err.to_string().contains("split ratio"));

        let err = AppConfig::builder().threshold(101.0).build().unwrap_err();
        assert!(err.to_string().contains("0-100"));

        let err = AppConfig::builder()
            .download_sources(DatasetSource::new(""), DatasetSource::new(DEFAULT_TEST_URL))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("urls are required"));

        let mut config = AppConfig::default();
        config.capture.capture_key = 'q';
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.training.params.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = AppConfig::builder()
            .dataset_root("custom")
            .webcam_index(1)
            .split_seed(Some(7))
            .post_process(PostProcess::Grayscale)
            .model_file(Some("model.onnx"))
            .frame_preprocess(FramePreprocess {
                rotate_clockwise: true,
                crop: Some(CropMargins {
                    top: 210,
                    bottom: 210,
                    left: 30,
                    right: 150,
                }),
            })
            .build()
            .unwrap();

        assert_eq!(config.layout().root(), Path::new("custom"));
        assert_eq!(config.capture.webcam_index, 1);
        assert_eq!(config.dataset.split_seed, Some(7));
        assert_eq!(config.detection.model_file.as_deref(), Some("model.onnx"));
        assert!(config.detection.preprocess.rotate_clockwise);
    }

    #[test]
    fn test_json_config_uses_defaults_for_missing_fields() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"model_family": "densenet121", "dataset": {"root": "rps", "split_seed": 3}}"#,
        )
        .unwrap();

        let config = AppConfig::from_json_file(&path).unwrap();
        assert_eq!(config.model_family, ModelFamily::DenseNet121);
        assert_eq!(config.dataset.root, PathBuf::from("rps"));
        assert_eq!(config.dataset.split_seed, Some(3));
        assert_eq!(config.download.chunk_size, 4096);

        std::fs::write(&path, "not json").unwrap();
        assert!(AppConfig::from_json_file(&path).is_err());
    }

    #[test]
    fn test_post_process_parsing() {
        assert_eq!("grayscale".parse::<PostProcess>().unwrap(), PostProcess::Grayscale);
        assert_eq!("canny".parse::<PostProcess>().unwrap(), PostProcess::EdgeDetect);
        assert!("blur".parse::<PostProcess>().is_err());
    }
}
