//! Core domain types shared across the dataset, training and detection flows

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single webcam frame in RGB order
pub type Frame = image::RgbImage;

/// The three gesture classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    /// All moves, in capture order
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Folder and label name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissors => "scissors",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Move {
    type Err = crate::error::RpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rock" => Ok(Move::Rock),
            "paper" => Ok(Move::Paper),
            "scissors" => Ok(Move::Scissors),
            other => Err(crate::error::RpsError::invalid_config(format!(
                "Unknown move '{}'. Expected rock, paper or scissors",
                other
            ))),
        }
    }
}

/// Dataset subsets produced by the split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub const ALL: [Split; 2] = [Split::Train, Split::Test];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (label, confidence) pair returned by a predictor
///
/// `confidence` is a probability in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

impl Prediction {
    pub fn new<S: Into<String>>(label: S, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Paths of every artifact below the dataset root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    /// File name of the label map written by the training engine
    pub const LABEL_MAP_FILE: &'static str = "model_class.json";

    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<move>` holding raw captures
    #[must_use]
    pub fn move_dir(&self, mv: Move) -> PathBuf {
        self.root.join(mv.as_str())
    }

    /// `<root>/train` or `<root>/test`
    #[must_use]
    pub fn split_dir(&self, split: Split) -> PathBuf {
        self.root.join(split.as_str())
    }

    /// `<root>/<split>/<move>`
    #[must_use]
    pub fn split_move_dir(&self, split: Split, mv: Move) -> PathBuf {
        self.split_dir(split).join(mv.as_str())
    }

    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    #[must_use]
    pub fn json_dir(&self) -> PathBuf {
        self.root.join("json")
    }

    #[must_use]
    pub fn label_map_path(&self) -> PathBuf {
        self.json_dir().join(Self::LABEL_MAP_FILE)
    }

    /// `<root>/<move>/img_<index>.jpg`
    #[must_use]
    pub fn capture_path(&self, mv: Move, index: u64) -> PathBuf {
        self.move_dir(mv).join(format!("img_{}.jpg", index))
    }
}
