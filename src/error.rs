//! Error types for dataset, training and detection operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rock-paper-scissors operations
pub type Result<T> = std::result::Result<T, RpsError>;

/// Comprehensive error types for the gesture recognizer tooling
#[derive(Error, Debug)]
pub enum RpsError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP transfer errors
    #[error("Network error: {0}")]
    Network(String),

    /// Zip archive errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// Camera or preview window errors
    #[error("Camera error: {0}")]
    Camera(String),

    /// Backend inference errors
    #[error("Inference error: {0}")]
    Inference(String),

    /// Model loading or label map errors
    #[error("Model error: {0}")]
    Model(String),

    /// No usable model artifact was found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The dataset directory is missing
    #[error("Dataset not found at '{}'. Run the \"Download dataset\" command first", .0.display())]
    DatasetNotFound(PathBuf),

    /// External training engine failures
    #[error("Training error: {0}")]
    Training(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Interactive input could not be read
    #[error("Input error: {0}")]
    Input(String),

    /// Frame or tensor processing errors
    #[error("Processing error: {0}")]
    Processing(String),

    /// Functionality that was not compiled in
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpsError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new camera error
    pub fn camera<S: Into<String>>(msg: S) -> Self {
        Self::Camera(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new training error
    pub fn training<S: Into<String>>(msg: S) -> Self {
        Self::Training(msg.into())
    }

    /// Create a new archive error
    pub fn archive<S: Into<String>>(msg: S) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a new input error
    pub fn input<S: Into<String>>(msg: S) -> Self {
        Self::Input(msg.into())
    }

    /// Create a new unsupported-feature error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    // Contextual error creators

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create network error with the underlying cause
    pub fn network_error<S: Into<String>, E: std::fmt::Display>(context: S, error: E) -> Self {
        Self::Network(format!("{}: {}", context.into(), error))
    }

    /// Create image error with the file it concerns
    pub fn image_file_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &image::ImageError,
    ) -> Self {
        Self::Processing(format!(
            "Failed to {} image '{}': {}",
            operation,
            path.as_ref().display(),
            error
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Errors after which the interactive menu can keep running
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DatasetNotFound(_) | Self::ModelNotFound(_))
    }
}
