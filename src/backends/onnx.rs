//! ONNX Runtime move predictor
//!
//! Loads a classifier exported from the training engine and maps its outputs
//! to move labels through the label map written alongside it.

use crate::config::DetectionConfig;
use crate::error::{Result, RpsError};
use crate::inference::{LabelMap, MovePredictor, OutputActivation};
use crate::models::ModelFamily;
use crate::types::{Frame, Prediction};
use crate::utils::{ImagePreprocessor, TensorLayout};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;

/// ONNX Runtime backed classifier
#[derive(Debug)]
pub struct OnnxPredictor {
    session: Session,
    labels: LabelMap,
    family: ModelFamily,
    layout: TensorLayout,
    activation: OutputActivation,
}

impl OnnxPredictor {
    /// Load a model and its label map
    ///
    /// # Errors
    /// - `ModelNotFound` when the model or label map file is missing
    /// - Label map entry count differs from `config.num_classes`
    /// - ONNX Runtime session creation failures
    pub fn load(
        model_path: &Path,
        label_map_path: &Path,
        family: ModelFamily,
        config: &DetectionConfig,
    ) -> Result<Self> {
        if !model_path.is_file() {
            return Err(RpsError::ModelNotFound(format!(
                "model file '{}' does not exist",
                model_path.display()
            )));
        }
        let labels = LabelMap::from_file(label_map_path, config.num_classes)?;

        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(4)
        };

        let session = Session::builder()
            .map_err(|e| RpsError::model(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RpsError::model(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(intra_threads)
            .map_err(|e| RpsError::model(format!("Failed to set intra threads: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| {
                RpsError::model(format!(
                    "Failed to load model '{}': {e}",
                    model_path.display()
                ))
            })?;

        log::info!(
            "✅ Loaded {} model {} ({} classes, {} threads)",
            family,
            model_path.display(),
            labels.len(),
            intra_threads
        );

        Ok(Self {
            session,
            labels,
            family,
            layout: config.tensor_layout,
            activation: config.output_activation,
        })
    }
}

impl MovePredictor for OnnxPredictor {
    fn predict(&mut self, frame: &Frame) -> Result<Vec<Prediction>> {
        let tensor = ImagePreprocessor::frame_to_tensor(
            frame,
            self.family.input_size(),
            self.family.normalization(),
            self.layout,
        )?;
        log::trace!("Running inference on tensor {:?}", tensor.dim());

        let input_value = Value::from_array(tensor)
            .map_err(|e| RpsError::processing(format!("Failed to convert input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| RpsError::inference(format!("ONNX inference failed: {e}")))?;

        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| RpsError::inference("No output tensors found"))?;
        let scores: Vec<f32> = outputs
            .get(first_key)
            .ok_or_else(|| RpsError::inference("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| RpsError::inference(format!("Failed to extract output tensor: {e}")))?
            .iter()
            .copied()
            .collect();

        self.labels.predictions(&scores, self.activation)
    }
}
