//! Frame preprocessing utilities
//!
//! Detection frames may need to be rotated and cropped before they are shown
//! and classified, then resized and normalized into the tensor layout the
//! trained network expects.

use crate::{
    error::{Result, RpsError},
    models::Normalization,
    types::Frame,
};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

/// Pixels trimmed from each side of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CropMargins {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl std::str::FromStr for CropMargins {
    type Err = RpsError;

    /// Parse `top,bottom,left,right`
    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| RpsError::invalid_config(format!("invalid crop margins '{}': {}", s, e)))?;

        match values.as_slice() {
            [top, bottom, left, right] => Ok(Self {
                top: *top,
                bottom: *bottom,
                left: *left,
                right: *right,
            }),
            _ => Err(RpsError::invalid_config(format!(
                "crop margins need 4 values (top,bottom,left,right), got '{}'",
                s
            ))),
        }
    }
}

/// Geometric adjustments applied to each detection frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FramePreprocess {
    /// Rotate 90° clockwise (camera mounted sideways)
    pub rotate_clockwise: bool,
    /// Margins trimmed after rotation
    pub crop: Option<CropMargins>,
}

impl FramePreprocess {
    /// Margins suited to a sideways camera with the hand on the left
    pub const SIDEWAYS_CROP: CropMargins = CropMargins {
        top: 210,
        bottom: 210,
        left: 30,
        right: 150,
    };

    #[must_use]
    pub fn is_identity(&self) -> bool {
        !self.rotate_clockwise && self.crop.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(crop) = self.crop {
            let vertical = u64::from(crop.top) + u64::from(crop.bottom);
            let horizontal = u64::from(crop.left) + u64::from(crop.right);
            if vertical >= u64::from(u32::MAX) || horizontal >= u64::from(u32::MAX) {
                return Err(RpsError::invalid_config("crop margins are too large"));
            }
        }
        Ok(())
    }

    /// Rotate then crop a frame
    ///
    /// # Errors
    /// - Crop margins leave no pixels
    pub fn apply(&self, frame: &Frame) -> Result<Frame> {
        let rotated;
        let source = if self.rotate_clockwise {
            rotated = image::imageops::rotate90(frame);
            &rotated
        } else {
            frame
        };

        let Some(crop) = self.crop else {
            return Ok(source.clone());
        };

        let (width, height) = source.dimensions();
        let new_width = width
            .checked_sub(crop.left.saturating_add(crop.right))
            .filter(|w| *w > 0);
        let new_height = height
            .checked_sub(crop.top.saturating_add(crop.bottom))
            .filter(|h| *h > 0);

        match (new_width, new_height) {
            (Some(w), Some(h)) => {
                Ok(image::imageops::crop_imm(source, crop.left, crop.top, w, h).to_image())
            },
            _ => Err(RpsError::processing(format!(
                "crop margins {:?} do not fit a {}x{} frame",
                crop, width, height
            ))),
        }
    }
}

/// Dimension order of the model input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, height, width, 3]`, as exported from Keras
    #[default]
    Nhwc,
    /// `[1, 3, height, width]`
    Nchw,
}

/// Frame to tensor conversion
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Resize a frame to `size`×`size` and normalize it into a batch of one
    ///
    /// # Errors
    /// - Empty frame or zero target size
    pub fn frame_to_tensor(
        frame: &Frame,
        size: u32,
        normalization: Normalization,
        layout: TensorLayout,
    ) -> Result<Array4<f32>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(RpsError::processing("cannot preprocess an empty frame"));
        }
        if size == 0 {
            return Err(RpsError::processing("target size must be positive"));
        }

        let resized = if frame.dimensions() == (size, size) {
            frame.clone()
        } else {
            image::imageops::resize(frame, size, size, image::imageops::FilterType::Triangle)
        };

        let side = usize::try_from(size)
            .map_err(|_| RpsError::processing("target size too large for tensor allocation"))?;
        let mut tensor = match layout {
            TensorLayout::Nhwc => Array4::<f32>::zeros((1, side, side, 3)),
            TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, side, side)),
        };

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match the resized frame
        for (y, row) in resized.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                let channels = Self::normalize_pixel(pixel.0, normalization);
                for (c, value) in channels.into_iter().enumerate() {
                    match layout {
                        TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                        TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                    }
                }
            }
        }

        Ok(tensor)
    }

    /// Normalize one RGB pixel into the three model channels
    fn normalize_pixel(rgb: [u8; 3], normalization: Normalization) -> [f32; 3] {
        let [r, g, b] = rgb.map(f32::from);
        match normalization {
            Normalization::Caffe { mean_bgr } => {
                [b - mean_bgr[0], g - mean_bgr[1], r - mean_bgr[2]]
            },
            Normalization::Torch { mean, std } => [
                (r / 255.0 - mean[0]) / std[0],
                (g / 255.0 - mean[1]) / std[1],
                (b / 255.0 - mean[2]) / std[2],
            ],
            Normalization::Tf => [r / 127.5 - 1.0, g / 127.5 - 1.0, b / 127.5 - 1.0],
        }
    }
}
