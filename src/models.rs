//! Model families and trained model artifact discovery
//!
//! The training engine and the predictor must agree on the network family.
//! Each family fixes the input resolution and the pixel normalization used
//! at inference time, and the argument understood by the training engine.

use crate::error::{Result, RpsError};
use crate::services::Prompter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Supported classification network families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    #[default]
    ResNet50,
    SqueezeNet,
    InceptionV3,
    DenseNet121,
}

/// Pixel normalization scheme expected by a family
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// BGR channel order with per-channel mean subtraction on the 0-255 scale
    Caffe { mean_bgr: [f32; 3] },
    /// 0-1 scale, then per-channel mean/std on RGB
    Torch { mean: [f32; 3], std: [f32; 3] },
    /// Scale to [-1, 1]
    Tf,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::ResNet50,
        ModelFamily::SqueezeNet,
        ModelFamily::InceptionV3,
        ModelFamily::DenseNet121,
    ];

    /// Square input side length in pixels
    #[must_use]
    pub fn input_size(self) -> u32 {
        match self {
            ModelFamily::InceptionV3 => 299,
            ModelFamily::ResNet50 | ModelFamily::SqueezeNet | ModelFamily::DenseNet121 => 224,
        }
    }

    #[must_use]
    pub fn normalization(self) -> Normalization {
        const IMAGENET_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];
        match self {
            ModelFamily::ResNet50 | ModelFamily::SqueezeNet => Normalization::Caffe {
                mean_bgr: IMAGENET_MEAN_BGR,
            },
            ModelFamily::DenseNet121 => Normalization::Torch {
                mean: [0.485, 0.456, 0.406],
                std: [0.229, 0.224, 0.225],
            },
            ModelFamily::InceptionV3 => Normalization::Tf,
        }
    }

    /// Name passed to the external training engine
    #[must_use]
    pub fn engine_name(self) -> &'static str {
        match self {
            ModelFamily::ResNet50 => "resnet50",
            ModelFamily::SqueezeNet => "squeezenet",
            ModelFamily::InceptionV3 => "inceptionv3",
            ModelFamily::DenseNet121 => "densenet121",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.engine_name())
    }
}

impl std::str::FromStr for ModelFamily {
    type Err = RpsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "resnet" | "resnet50" => Ok(ModelFamily::ResNet50),
            "squeezenet" => Ok(ModelFamily::SqueezeNet),
            "inception" | "inceptionv3" => Ok(ModelFamily::InceptionV3),
            "densenet" | "densenet121" => Ok(ModelFamily::DenseNet121),
            other => Err(RpsError::invalid_config(format!(
                "Unknown model family '{}'. Expected one of: \
                 resnet50, squeezenet, inceptionv3, densenet121",
                other
            ))),
        }
    }
}

/// List the regular files in the models directory, sorted by name
///
/// # Errors
/// - `ModelNotFound` when the directory is missing or holds no files
pub fn list_model_files(models_dir: &Path) -> Result<Vec<String>> {
    if !models_dir.is_dir() {
        return Err(RpsError::ModelNotFound(format!(
            "models directory '{}' does not exist. Train a model first",
            models_dir.display()
        )));
    }

    let entries = std::fs::read_dir(models_dir)
        .map_err(|e| RpsError::file_io_error("list models directory", models_dir, &e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| RpsError::file_io_error("read models directory", models_dir, &e))?;
        if entry.path().is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(RpsError::ModelNotFound(format!(
            "no model files in '{}'",
            models_dir.display()
        )));
    }
    Ok(files)
}

/// Ask the user which model file to use, re-asking until the index is valid
pub fn choose_model_file(models_dir: &Path, prompter: &mut dyn Prompter) -> Result<PathBuf> {
    let files = list_model_files(models_dir)?;

    loop {
        prompter.notify("Available models:");
        for (idx, name) in files.iter().enumerate() {
            prompter.notify(&format!("{}. {}", idx, name));
        }

        let choice = prompter.read_number("Which model do you want to use?")?;
        let chosen = usize::try_from(choice).ok().and_then(|idx| files.get(idx));
        if let Some(name) = chosen {
            log::info!("Using model {}", name);
            return Ok(models_dir.join(name));
        }
        log::debug!("Model index {} out of range", choice);
    }
}
