//! Live move detection from the webcam

use crate::capture::{CaptureBackend, CaptureSession};
use crate::config::{AppConfig, DetectionConfig};
use crate::error::{Result, RpsError};
use crate::inference::{overlay_for, MovePredictor};
use crate::models::choose_model_file;
use crate::services::Prompter;
use crate::types::DatasetLayout;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Counters from one detection loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionStats {
    /// Frames classified
    pub frames: u64,
    /// Frames shown with a prediction overlay
    pub annotated: u64,
}

/// Classifies webcam frames and shows the confident predictions
#[derive(Debug, Clone)]
pub struct MoveDetector {
    layout: DatasetLayout,
    detection: DetectionConfig,
    webcam_index: i32,
    quit_key: char,
}

impl MoveDetector {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            layout: config.layout(),
            detection: config.detection.clone(),
            webcam_index: config.capture.webcam_index,
            quit_key: config.capture.quit_key,
        }
    }

    /// The model to load: the configured file, or one picked interactively
    ///
    /// # Errors
    /// - `ModelNotFound` when the configured file or every model is missing
    pub fn resolve_model_path(&self, prompter: &mut dyn Prompter) -> Result<PathBuf> {
        let models_dir = self.layout.models_dir();
        match &self.detection.model_file {
            Some(name) => {
                let path = models_dir.join(name);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(RpsError::ModelNotFound(format!(
                        "model file '{}' does not exist",
                        path.display()
                    )))
                }
            },
            None => choose_model_file(&models_dir, prompter),
        }
    }

    /// Resolve and load a model, then run detection on the configured webcam
    pub fn detect<F>(
        &self,
        backend: &dyn CaptureBackend,
        prompter: &mut dyn Prompter,
        load_predictor: F,
    ) -> Result<DetectionStats>
    where
        F: FnOnce(&Path) -> Result<Box<dyn MovePredictor>>,
    {
        let model_path = self.resolve_model_path(prompter)?;
        let span = crate::tracing_config::spans::detection(&model_path);
        let _enter = span.enter();

        let mut predictor = load_predictor(&model_path)?;
        let mut session = backend.open(self.webcam_index)?;
        prompter.notify(&format!("Detecting moves. Press '{}' to stop", self.quit_key));

        let stats = self.run(&mut session, predictor.as_mut())?;
        session.close()?;
        log::info!(
            "Detection stopped after {} frame(s), {} annotated",
            stats.frames,
            stats.annotated
        );
        Ok(stats)
    }

    /// Read, classify and display frames until the quit key is pressed
    pub fn run(
        &self,
        session: &mut CaptureSession,
        predictor: &mut dyn MovePredictor,
    ) -> Result<DetectionStats> {
        let mut stats = DetectionStats::default();

        loop {
            let frame = session.read_frame()?;
            let frame = if self.detection.preprocess.is_identity() {
                frame
            } else {
                self.detection.preprocess.apply(&frame)?
            };

            let predictions = predictor.predict(&frame)?;
            let overlay = overlay_for(&predictions, self.detection.threshold);
            stats.frames += 1;
            if let Some(text) = &overlay {
                log::debug!("Detected {}", text);
                stats.annotated += 1;
            }

            session.show(&self.detection.window_title, &frame, overlay.as_deref())?;

            if session.wait_key(Duration::from_millis(1))? == Some(self.quit_key) {
                break;
            }
            std::thread::sleep(self.detection.frame_delay());
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        solid_frame, FixedPredictor, ScriptedCamera, ScriptedPrompter, ScriptedWindow,
    };
    use crate::types::Prediction;
    use crate::utils::FramePreprocess;
    use tempfile::TempDir;

    fn detector(root: &Path, threshold: f32) -> MoveDetector {
        let mut config = AppConfig::builder()
            .dataset_root(root)
            .threshold(threshold)
            .build()
            .unwrap();
        config.detection.frame_delay_ms = 0;
        MoveDetector::new(&config)
    }

    fn rock_heavy() -> FixedPredictor {
        FixedPredictor::new(vec![
            Prediction::new("paper", 0.05),
            Prediction::new("rock", 0.9),
            Prediction::new("scissors", 0.05),
        ])
    }

    #[test]
    fn test_overlay_drawn_above_threshold() {
        let temp = TempDir::new().unwrap();
        let camera = ScriptedCamera::repeating(solid_frame(4, 4, [0, 0, 0]));
        let window = ScriptedWindow::new(vec![None, Some('q')]);
        let log = window.log();
        let mut session = CaptureSession::new(Box::new(camera), Box::new(window));

        let stats = detector(temp.path(), 80.0)
            .run(&mut session, &mut rock_heavy())
            .unwrap();

        assert_eq!(stats, DetectionStats { frames: 2, annotated: 2 });
        assert_eq!(log.overlays(), vec![Some("rock (0.9)".to_string()); 2]);
        assert!(log.titles().iter().all(|t| t == "Move predictor"));
    }

    #[test]
    fn test_no_overlay_below_threshold() {
        let temp = TempDir::new().unwrap();
        let camera = ScriptedCamera::repeating(solid_frame(4, 4, [0, 0, 0]));
        let window = ScriptedWindow::new(vec![Some('q')]);
        let log = window.log();
        let mut session = CaptureSession::new(Box::new(camera), Box::new(window));

        let stats = detector(temp.path(), 95.0)
            .run(&mut session, &mut rock_heavy())
            .unwrap();

        assert_eq!(stats.annotated, 0);
        assert_eq!(log.overlays(), vec![None]);
    }

    #[test]
    fn test_frames_are_rotated_and_cropped_before_use() {
        let temp = TempDir::new().unwrap();
        let preprocess = FramePreprocess {
            rotate_clockwise: true,
            crop: Some(FramePreprocess::SIDEWAYS_CROP),
        };
        let mut config = AppConfig::builder()
            .dataset_root(temp.path())
            .frame_preprocess(preprocess)
            .build()
            .unwrap();
        config.detection.frame_delay_ms = 0;

        let camera = ScriptedCamera::repeating(solid_frame(640, 480, [0, 0, 0]));
        let camera_log = camera.log();
        let window = ScriptedWindow::new(vec![None, Some('q')]);
        let window_log = window.log();
        let mut session = CaptureSession::new(Box::new(camera), Box::new(window));
        let mut predictor = rock_heavy();

        let stats = MoveDetector::new(&config)
            .run(&mut session, &mut predictor)
            .unwrap();

        assert_eq!(stats.frames, 2);
        assert_eq!(camera_log.reads(), 2);
        assert_eq!(predictor.seen_frames(), vec![(300, 220); 2]);
        assert_eq!(window_log.frame_sizes(), vec![(300, 220); 2]);
    }

    #[test]
    fn test_oversized_crop_stops_detection() {
        let temp = TempDir::new().unwrap();
        let preprocess = FramePreprocess {
            rotate_clockwise: true,
            crop: Some(FramePreprocess::SIDEWAYS_CROP),
        };
        let config = AppConfig::builder()
            .dataset_root(temp.path())
            .frame_preprocess(preprocess)
            .build()
            .unwrap();

        let camera = ScriptedCamera::repeating(solid_frame(320, 240, [0, 0, 0]));
        let window = ScriptedWindow::new(vec![Some('q')]);
        let window_log = window.log();
        let mut session = CaptureSession::new(Box::new(camera), Box::new(window));

        let err = MoveDetector::new(&config)
            .run(&mut session, &mut rock_heavy())
            .unwrap_err();
        assert!(matches!(err, RpsError::Processing(_)));
        assert_eq!(window_log.shown(), 0);
    }

    #[test]
    fn test_configured_model_must_exist() {
        let temp = TempDir::new().unwrap();
        let mut config = AppConfig::builder()
            .dataset_root(temp.path())
            .model_file(Some("missing.onnx"))
            .build()
            .unwrap();
        config.detection.frame_delay_ms = 0;

        let err = MoveDetector::new(&config)
            .resolve_model_path(&mut ScriptedPrompter::new())
            .unwrap_err();
        assert!(matches!(err, RpsError::ModelNotFound(_)));

        std::fs::create_dir_all(temp.path().join("models")).unwrap();
        std::fs::write(temp.path().join("models/missing.onnx"), b"x").unwrap();
        let path = MoveDetector::new(&config)
            .resolve_model_path(&mut ScriptedPrompter::new())
            .unwrap();
        assert_eq!(path, temp.path().join("models/missing.onnx"));
    }

    #[test]
    fn test_camera_failure_stops_detection() {
        let temp = TempDir::new().unwrap();
        let camera = ScriptedCamera::with_frames(vec![solid_frame(4, 4, [0, 0, 0])]);
        let window = ScriptedWindow::new(vec![None, None]);
        let mut session = CaptureSession::new(Box::new(camera), Box::new(window));

        let err = detector(temp.path(), 80.0)
            .run(&mut session, &mut rock_heavy())
            .unwrap_err();
        assert!(matches!(err, RpsError::Camera(_)));
    }
}
