//! OpenCV webcam and preview window backend

use super::{Camera, CaptureBackend, CaptureSession, PreviewWindow};
use crate::error::{Result, RpsError};
use crate::types::Frame;
use opencv::{core, highgui, imgproc, prelude::*, videoio};
use std::time::Duration;

fn cv_error(context: &str, e: opencv::Error) -> RpsError {
    RpsError::camera(format!("{}: {}", context, e))
}

/// Opens `VideoCapture` devices with a `highgui` preview window
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenCvBackend;

impl CaptureBackend for OpenCvBackend {
    fn open(&self, device_index: i32) -> Result<CaptureSession> {
        let capture = videoio::VideoCapture::new(device_index, videoio::CAP_ANY)
            .map_err(|e| cv_error("failed to create video capture", e))?;
        let opened = capture
            .is_opened()
            .map_err(|e| cv_error("failed to query video capture", e))?;
        if !opened {
            return Err(RpsError::camera(format!("cannot open webcam {}", device_index)));
        }
        log::debug!("Opened webcam {}", device_index);

        Ok(CaptureSession::new(
            Box::new(OpenCvCamera { capture }),
            Box::new(HighGuiWindow),
        ))
    }
}

struct OpenCvCamera {
    capture: videoio::VideoCapture,
}

impl Camera for OpenCvCamera {
    fn read_frame(&mut self) -> Result<Frame> {
        let mut mat = core::Mat::default();
        let grabbed = self
            .capture
            .read(&mut mat)
            .map_err(|e| cv_error("failed to read frame", e))?;
        if !grabbed || mat.empty() {
            return Err(RpsError::camera("webcam returned an empty frame"));
        }
        mat_to_frame(&mat)
    }

    fn release(&mut self) -> Result<()> {
        self.capture
            .release()
            .map_err(|e| cv_error("failed to release webcam", e))
    }
}

struct HighGuiWindow;

impl PreviewWindow for HighGuiWindow {
    fn show(&mut self, title: &str, frame: &Frame, overlay: Option<&str>) -> Result<()> {
        let mut mat = frame_to_mat(frame)?;
        if let Some(text) = overlay {
            draw_overlay(&mut mat, text)?;
        }
        highgui::imshow(title, &mat).map_err(|e| cv_error("failed to show frame", e))
    }

    fn wait_key(&mut self, delay: Duration) -> Result<Option<char>> {
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX).max(1);
        let code = highgui::wait_key(millis).map_err(|e| cv_error("failed to poll keyboard", e))?;
        if code < 0 {
            return Ok(None);
        }
        Ok(u32::try_from(code & 0xFF).ok().and_then(char::from_u32))
    }

    fn destroy_all(&mut self) -> Result<()> {
        highgui::destroy_all_windows().map_err(|e| cv_error("failed to close windows", e))
    }
}

/// Write the prediction text in white near the top-left corner
fn draw_overlay(mat: &mut core::Mat, text: &str) -> Result<()> {
    imgproc::put_text(
        mat,
        text,
        core::Point::new(10, 30),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        core::Scalar::new(255.0, 255.0, 255.0, 0.0),
        2,
        imgproc::LINE_AA,
        false,
    )
    .map_err(|e| cv_error("failed to draw overlay", e))
}

/// Convert a BGR `Mat` into an RGB frame
pub(crate) fn mat_to_frame(mat: &core::Mat) -> Result<Frame> {
    if mat.typ() != core::CV_8UC3 {
        return Err(RpsError::camera(format!(
            "unsupported frame type {}, expected 8-bit BGR",
            mat.typ()
        )));
    }
    let continuous;
    let mat = if mat.is_continuous() {
        mat
    } else {
        continuous = mat.try_clone().map_err(|e| cv_error("failed to copy frame", e))?;
        &continuous
    };

    let width = u32::try_from(mat.cols()).map_err(|_| RpsError::camera("negative frame width"))?;
    let height = u32::try_from(mat.rows()).map_err(|_| RpsError::camera("negative frame height"))?;
    let bytes = mat
        .data_bytes()
        .map_err(|e| cv_error("failed to access frame data", e))?;

    let mut rgb = Vec::with_capacity(bytes.len());
    for bgr in bytes.chunks_exact(3) {
        if let [b, g, r] = bgr {
            rgb.extend_from_slice(&[*r, *g, *b]);
        }
    }
    Frame::from_raw(width, height, rgb)
        .ok_or_else(|| RpsError::camera("frame buffer does not match its dimensions"))
}

/// Convert an RGB frame into a BGR `Mat`
pub(crate) fn frame_to_mat(frame: &Frame) -> Result<core::Mat> {
    let rows = i32::try_from(frame.height()).map_err(|_| RpsError::camera("frame too tall"))?;
    let cols = i32::try_from(frame.width()).map_err(|_| RpsError::camera("frame too wide"))?;
    let mut mat =
        core::Mat::new_rows_cols_with_default(rows, cols, core::CV_8UC3, core::Scalar::all(0.0))
            .map_err(|e| cv_error("failed to allocate frame", e))?;

    let data = mat
        .data_bytes_mut()
        .map_err(|e| cv_error("failed to access frame data", e))?;
    for (dst, src) in data.chunks_exact_mut(3).zip(frame.pixels()) {
        let [r, g, b] = src.0;
        dst.copy_from_slice(&[b, g, r]);
    }
    Ok(mat)
}
