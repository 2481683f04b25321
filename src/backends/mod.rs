//! Inference backends for move prediction
//!
//! - ONNX Runtime predictor (`onnx` feature)

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxPredictor;

use crate::config::AppConfig;
use crate::error::Result;
use crate::inference::MovePredictor;
use std::path::Path;

/// Load the predictor compiled into this build for `model_path`
///
/// The label map is read from `<root>/json/<label_map_file>`.
pub fn load_predictor(config: &AppConfig, model_path: &Path) -> Result<Box<dyn MovePredictor>> {
    let label_map = config.layout().json_dir().join(&config.detection.label_map_file);

    #[cfg(feature = "onnx")]
    {
        let predictor =
            OnnxPredictor::load(model_path, &label_map, config.model_family, &config.detection)?;
        Ok(Box::new(predictor))
    }
    #[cfg(not(feature = "onnx"))]
    {
        let _ = (model_path, label_map);
        Err(crate::error::RpsError::unsupported(
            "move detection requires the `onnx` feature",
        ))
    }
}
