//! Test doubles for the camera, prompts, predictor and training engine
//!
//! These scripted implementations let the capture, split, training and
//! detection flows run without a webcam, a terminal or a trained model.
//! Compiled for unit tests and behind the `test-utils` feature, which the
//! integration tests under `tests/` enable.

use crate::capture::{Camera, CaptureBackend, CaptureSession, PreviewWindow};
use crate::error::{Result, RpsError};
use crate::inference::MovePredictor;
use crate::models::ModelFamily;
use crate::services::{ProgressReporter, ProgressUnit, Prompter};
use crate::training::{TrainingEngine, TrainingParams};
use crate::types::{Frame, Prediction};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Build a frame filled with one color
#[must_use]
pub fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
    image::RgbImage::from_pixel(width, height, image::Rgb(rgb))
}

/// Shared record of what happened to a scripted camera
#[derive(Debug, Clone, Default)]
pub struct CameraLog {
    inner: Arc<Mutex<CameraEvents>>,
}

#[derive(Debug, Default)]
struct CameraEvents {
    reads: usize,
    released: usize,
}

impl CameraLog {
    #[must_use]
    pub fn reads(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).reads
    }

    #[must_use]
    pub fn released(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).released
    }
}

/// Camera replaying a fixed list of frames, optionally repeating the last one
pub struct ScriptedCamera {
    frames: VecDeque<Frame>,
    repeat: Option<Frame>,
    log: CameraLog,
}

impl ScriptedCamera {
    /// Camera delivering the same frame forever
    #[must_use]
    pub fn repeating(frame: Frame) -> Self {
        Self {
            frames: VecDeque::new(),
            repeat: Some(frame),
            log: CameraLog::default(),
        }
    }

    /// Camera delivering `frames` once, then failing
    #[must_use]
    pub fn with_frames(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            repeat: None,
            log: CameraLog::default(),
        }
    }

    #[must_use]
    pub fn log(&self) -> CameraLog {
        self.log.clone()
    }
}

impl Camera for ScriptedCamera {
    fn read_frame(&mut self) -> Result<Frame> {
        self.log.inner.lock().unwrap_or_else(PoisonError::into_inner).reads += 1;
        if let Some(frame) = self.frames.pop_front() {
            return Ok(frame);
        }
        self.repeat
            .clone()
            .ok_or_else(|| RpsError::camera("scripted camera ran out of frames"))
    }

    fn release(&mut self) -> Result<()> {
        self.log.inner.lock().unwrap_or_else(PoisonError::into_inner).released += 1;
        Ok(())
    }
}

/// Shared record of what a scripted window displayed
#[derive(Debug, Clone, Default)]
pub struct WindowLog {
    inner: Arc<Mutex<WindowEvents>>,
}

#[derive(Debug, Default)]
struct WindowEvents {
    shown: Vec<(String, Option<String>, (u32, u32))>,
    destroyed: usize,
}

impl WindowLog {
    /// Overlay text of every displayed frame, in order
    #[must_use]
    pub fn overlays(&self) -> Vec<Option<String>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shown
            .iter()
            .map(|(_, overlay, _)| overlay.clone())
            .collect()
    }

    /// Dimensions of every displayed frame, in order
    #[must_use]
    pub fn frame_sizes(&self) -> Vec<(u32, u32)> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shown
            .iter()
            .map(|(_, _, size)| *size)
            .collect()
    }

    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shown
            .iter()
            .map(|(title, _, _)| title.clone())
            .collect()
    }

    #[must_use]
    pub fn shown(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).shown.len()
    }

    #[must_use]
    pub fn destroyed(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).destroyed
    }
}

/// Window answering `wait_key` from a key script
pub struct ScriptedWindow {
    keys: VecDeque<Option<char>>,
    log: WindowLog,
}

impl ScriptedWindow {
    #[must_use]
    pub fn new(keys: Vec<Option<char>>) -> Self {
        Self {
            keys: keys.into(),
            log: WindowLog::default(),
        }
    }

    #[must_use]
    pub fn log(&self) -> WindowLog {
        self.log.clone()
    }
}

impl PreviewWindow for ScriptedWindow {
    fn show(&mut self, title: &str, frame: &Frame, overlay: Option<&str>) -> Result<()> {
        self.log.inner.lock().unwrap_or_else(PoisonError::into_inner).shown.push((
            title.to_string(),
            overlay.map(str::to_string),
            frame.dimensions(),
        ));
        Ok(())
    }

    fn wait_key(&mut self, _delay: Duration) -> Result<Option<char>> {
        self.keys
            .pop_front()
            .ok_or_else(|| RpsError::camera("scripted window ran out of key presses"))
    }

    fn destroy_all(&mut self) -> Result<()> {
        self.log.inner.lock().unwrap_or_else(PoisonError::into_inner).destroyed += 1;
        Ok(())
    }
}

/// Backend handing out scripted sessions, one key script per `open`
pub struct ScriptedBackend {
    frame: Frame,
    key_scripts: Mutex<VecDeque<Vec<Option<char>>>>,
    opened: Mutex<Vec<i32>>,
    camera_logs: Mutex<Vec<CameraLog>>,
    window_logs: Mutex<Vec<WindowLog>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            key_scripts: Mutex::new(VecDeque::new()),
            opened: Mutex::new(Vec::new()),
            camera_logs: Mutex::new(Vec::new()),
            window_logs: Mutex::new(Vec::new()),
        }
    }

    /// Key presses for successive sessions
    #[must_use]
    pub fn with_key_script(self, scripts: Vec<Vec<Option<char>>>) -> Self {
        *self.key_scripts.lock().unwrap_or_else(PoisonError::into_inner) = scripts.into();
        self
    }

    #[must_use]
    pub fn opened_devices(&self) -> Vec<i32> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn camera_logs(&self) -> Vec<CameraLog> {
        self.camera_logs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn window_logs(&self) -> Vec<WindowLog> {
        self.window_logs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl CaptureBackend for ScriptedBackend {
    fn open(&self, device_index: i32) -> Result<CaptureSession> {
        let keys = self
            .key_scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| {
                RpsError::camera(format!("no scripted session for device {}", device_index))
            })?;

        let camera = ScriptedCamera::repeating(self.frame.clone());
        let window = ScriptedWindow::new(keys);
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).push(device_index);
        self.camera_logs.lock().unwrap_or_else(PoisonError::into_inner).push(camera.log());
        self.window_logs.lock().unwrap_or_else(PoisonError::into_inner).push(window.log());

        Ok(CaptureSession::new(Box::new(camera), Box::new(window)))
    }
}

/// Prompter answering from scripted queues
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    confirms: VecDeque<bool>,
    default_confirm: bool,
    numbers: VecDeque<i64>,
    questions: Vec<String>,
    messages: Vec<String>,
}

impl ScriptedPrompter {
    /// Prompter that declines every confirmation and has no numbers queued
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every confirmation without a scripted answer with `answer`
    #[must_use]
    pub fn confirm_all(mut self, answer: bool) -> Self {
        self.default_confirm = answer;
        self
    }

    #[must_use]
    pub fn with_confirms<I: IntoIterator<Item = bool>>(mut self, answers: I) -> Self {
        self.confirms.extend(answers);
        self
    }

    #[must_use]
    pub fn with_numbers<I: IntoIterator<Item = i64>>(mut self, numbers: I) -> Self {
        self.numbers.extend(numbers);
        self
    }

    /// Every question asked so far
    #[must_use]
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Every notification shown so far
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        self.questions.push(question.to_string());
        Ok(self.confirms.pop_front().unwrap_or(self.default_confirm))
    }

    fn read_number(&mut self, question: &str) -> Result<i64> {
        self.questions.push(question.to_string());
        self.numbers
            .pop_front()
            .ok_or_else(|| RpsError::input("no scripted number left"))
    }

    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

/// Predictor returning the same predictions for every frame
#[derive(Debug, Clone)]
pub struct FixedPredictor {
    predictions: Vec<Prediction>,
    calls: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl FixedPredictor {
    #[must_use]
    pub fn new(predictions: Vec<Prediction>) -> Self {
        Self {
            predictions,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Frame dimensions seen by `predict`
    #[must_use]
    pub fn seen_frames(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl MovePredictor for FixedPredictor {
    fn predict(&mut self, frame: &Frame) -> Result<Vec<Prediction>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(frame.dimensions());
        Ok(self.predictions.clone())
    }
}

/// Training engine recording how it was configured
#[derive(Debug, Default)]
pub struct RecordingTrainingEngine {
    pub family: Option<ModelFamily>,
    pub data_dir: Option<PathBuf>,
    pub trained_with: Vec<TrainingParams>,
    /// Order of calls, for dispatch assertions
    pub calls: Vec<&'static str>,
}

impl TrainingEngine for RecordingTrainingEngine {
    fn set_model_family(&mut self, family: ModelFamily) -> Result<()> {
        self.calls.push("set_model_family");
        self.family = Some(family);
        Ok(())
    }

    fn set_data_directory(&mut self, dir: &Path) -> Result<()> {
        self.calls.push("set_data_directory");
        self.data_dir = Some(dir.to_path_buf());
        Ok(())
    }

    fn train(&mut self, params: &TrainingParams) -> Result<()> {
        self.calls.push("train");
        self.trained_with.push(params.clone());
        Ok(())
    }
}

/// Progress reporter keeping every reported value
#[derive(Debug, Default)]
pub struct RecordingProgressReporter {
    starts: Mutex<Vec<(String, Option<u64>)>>,
    advanced: Mutex<u64>,
    finished: Mutex<Vec<String>>,
}

impl RecordingProgressReporter {
    /// Labels and totals of every started task
    #[must_use]
    pub fn starts(&self) -> Vec<(String, Option<u64>)> {
        self.starts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Total of the most recently started task
    #[must_use]
    pub fn last_total(&self) -> Option<u64> {
        self.starts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .and_then(|(_, total)| *total)
    }

    /// Sum of all advances
    #[must_use]
    pub fn advanced(&self) -> u64 {
        *self.advanced.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ProgressReporter for RecordingProgressReporter {
    fn start(&self, label: &str, total: Option<u64>, _unit: ProgressUnit) {
        self.starts.lock().unwrap_or_else(PoisonError::into_inner).push((label.to_string(), total));
    }

    fn advance(&self, delta: u64) {
        *self.advanced.lock().unwrap_or_else(PoisonError::into_inner) += delta;
    }

    fn finish(&self, message: &str) {
        self.finished.lock().unwrap_or_else(PoisonError::into_inner).push(message.to_string());
    }
}
