//! Move prediction abstraction and result selection
//!
//! A `MovePredictor` turns a frame into one confidence per class. The
//! helpers here pick the winning class and build the overlay text shown
//! in the detection window.

use crate::error::{Result, RpsError};
use crate::types::{Frame, Prediction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Anything that can classify a frame into moves
pub trait MovePredictor {
    /// Predict one confidence in `[0, 1]` per known class
    ///
    /// # Errors
    /// - Tensor conversion failures
    /// - Backend inference failures
    fn predict(&mut self, frame: &Frame) -> Result<Vec<Prediction>>;
}

impl<P: MovePredictor + ?Sized> MovePredictor for Box<P> {
    fn predict(&mut self, frame: &Frame) -> Result<Vec<Prediction>> {
        (**self).predict(frame)
    }
}

/// How raw model outputs map to probabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// The model already ends in softmax
    #[default]
    Probabilities,
    /// Apply softmax to the raw outputs
    Logits,
}

/// Class index to label mapping written by the training engine
///
/// On disk this is a JSON object such as `{"0": "paper", "1": "rock", "2": "scissors"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    /// Parse a label map and check it holds exactly `num_classes` entries
    /// indexed `0..num_classes`
    pub fn from_json(json: &str, num_classes: usize) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)
            .map_err(|e| RpsError::model(format!("invalid label map: {}", e)))?;

        if raw.len() != num_classes {
            return Err(RpsError::model(format!(
                "label map has {} entries but {} classes are expected",
                raw.len(),
                num_classes
            )));
        }

        let mut labels = vec![String::new(); num_classes];
        for (key, label) in raw {
            let index: usize = key
                .trim()
                .parse()
                .map_err(|_| RpsError::model(format!("label map key '{}' is not an index", key)))?;
            let slot = labels.get_mut(index).ok_or_else(|| {
                RpsError::model(format!(
                    "label map index {} is out of range for {} classes",
                    index, num_classes
                ))
            })?;
            *slot = label;
        }

        Ok(Self { labels })
    }

    pub fn from_file(path: &Path, num_classes: usize) -> Result<Self> {
        if !path.is_file() {
            return Err(RpsError::ModelNotFound(format!(
                "label map '{}' does not exist. Train a model first",
                path.display()
            )));
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RpsError::file_io_error("read label map", path, &e))?;
        Self::from_json(&contents, num_classes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Pair raw model outputs with their labels
    pub fn predictions(
        &self,
        scores: &[f32],
        activation: OutputActivation,
    ) -> Result<Vec<Prediction>> {
        if scores.len() != self.labels.len() {
            return Err(RpsError::inference(format!(
                "model produced {} scores for {} classes",
                scores.len(),
                self.labels.len()
            )));
        }

        let confidences = match activation {
            OutputActivation::Probabilities => scores.to_vec(),
            OutputActivation::Logits => softmax(scores),
        };

        Ok(self
            .labels
            .iter()
            .zip(confidences)
            .map(|(label, confidence)| Prediction::new(label.clone(), confidence))
            .collect())
    }
}

/// Numerically stable softmax
#[must_use]
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; scores.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Highest-confidence prediction; ties go to the alphabetically-first label
#[must_use]
pub fn best_prediction(predictions: &[Prediction]) -> Option<&Prediction> {
    predictions.iter().reduce(|best, candidate| {
        let better = candidate.confidence > best.confidence
            || (candidate.confidence == best.confidence && candidate.label < best.label);
        if better {
            candidate
        } else {
            best
        }
    })
}

/// Confidence rounded to two decimals without trailing zeros (`0.9`, `1.0`, `0.87`)
#[must_use]
pub fn format_confidence(confidence: f32) -> String {
    let rounded = (f64::from(confidence) * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let trimmed = text.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Overlay text for a prediction: `"<label> (<confidence>)"`
#[must_use]
pub fn format_overlay(prediction: &Prediction) -> String {
    format!("{} ({})", prediction.label, format_confidence(prediction.confidence))
}

/// Overlay text for the winning class, if it reaches `threshold` (0-100 scale)
#[must_use]
pub fn overlay_for(predictions: &[Prediction], threshold: f32) -> Option<String> {
    best_prediction(predictions)
        .filter(|best| best.confidence >= threshold / 100.0)
        .map(format_overlay)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER_ROCK_SCISSORS: &str = r#"{"0": "paper", "1": "rock", "2": "scissors"}"#;

    fn rock_heavy() -> Vec<Prediction> {
        vec![
            Prediction::new("paper", 0.05),
            Prediction::new("rock", 0.9),
            Prediction::new("scissors", 0.05),
        ]
    }

    #[test]
    fn test_overlay_respects_threshold() {
        assert_eq!(overlay_for(&rock_heavy(), 80.0).as_deref(), Some("rock (0.9)"));
        assert_eq!(overlay_for(&rock_heavy(), 95.0), None);
        assert_eq!(overlay_for(&[], 0.0), None);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let rock = overlay_for(&[Prediction::new("rock", 0.53)], 53.0);
        assert_eq!(rock.as_deref(), Some("rock (0.53)"));
        let paper = overlay_for(&[Prediction::new("paper", 0.59)], 59.0);
        assert_eq!(paper.as_deref(), Some("paper (0.59)"));

        for k in 0..=100u16 {
            let confidence = f32::from(k) / 100.0;
            let threshold = f32::from(k);
            assert!(
                overlay_for(&[Prediction::new("rock", confidence)], threshold).is_some(),
                "confidence {} should meet threshold {}",
                confidence,
                threshold
            );

            if k > 0 {
                let just_below = f32::from_bits(confidence.to_bits() - 1);
                assert_eq!(overlay_for(&[Prediction::new("rock", just_below)], threshold), None);
            }
        }
    }

    #[test]
    fn test_confidence_formatting() {
        assert_eq!(format_confidence(0.9), "0.9");
        assert_eq!(format_confidence(1.0), "1.0");
        assert_eq!(format_confidence(0.874), "0.87");
        assert_eq!(format_confidence(0.999), "1.0");
        assert_eq!(format_confidence(0.0), "0.0");
    }

    #[test]
    fn test_ties_break_alphabetically() {
        let predictions = vec![
            Prediction::new("scissors", 0.5),
            Prediction::new("paper", 0.5),
            Prediction::new("rock", 0.0),
        ];
        assert_eq!(best_prediction(&predictions).unwrap().label, "paper");
    }

    #[test]
    fn test_label_map_parsing() {
        let map = LabelMap::from_json(PAPER_ROCK_SCISSORS, 3).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.label(1), Some("rock"));

        assert!(LabelMap::from_json(r#"{"0": "paper", "1": "rock"}"#, 3).is_err());
        assert!(LabelMap::from_json(r#"{"0": "a", "1": "b", "5": "c"}"#, 3).is_err());
        assert!(LabelMap::from_json(r#"{"x": "a"}"#, 1).is_err());
        assert!(LabelMap::from_json("[]", 0).is_err());
    }

    #[test]
    fn test_missing_label_map_is_recoverable() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = LabelMap::from_file(&temp.path().join("model_class.json"), 3).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_predictions_with_softmax() {
        let map = LabelMap::from_json(PAPER_ROCK_SCISSORS, 3).unwrap();

        let predictions = map
            .predictions(&[0.0, 2.0, 0.0], OutputActivation::Logits)
            .unwrap();
        let total: f32 = predictions.iter().map(|p| p.confidence).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(best_prediction(&predictions).unwrap().label, "rock");

        let predictions = map
            .predictions(&[0.1, 0.2, 0.7], OutputActivation::Probabilities)
            .unwrap();
        assert_eq!(predictions[2], Prediction::new("scissors", 0.7));

        assert!(map.predictions(&[1.0], OutputActivation::Probabilities).is_err());
    }
}
