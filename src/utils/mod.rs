//! Shared utilities

pub mod preprocessing;

pub use preprocessing::{CropMargins, FramePreprocess, ImagePreprocessor, TensorLayout};
