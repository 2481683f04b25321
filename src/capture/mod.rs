//! Video source lifecycle
//!
//! A `CaptureSession` owns a camera and its preview window for the duration
//! of one capture or detection loop. Dropping the session releases the
//! device and tears the windows down, so every exit path (normal return,
//! `?` propagation, panics) leaves the camera free for the next command.

#[cfg(feature = "opencv")]
pub mod opencv;

use crate::error::{Result, RpsError};
use crate::types::Frame;
use std::time::Duration;

#[cfg(feature = "opencv")]
pub use self::opencv::OpenCvBackend;

/// A frame source such as a webcam
pub trait Camera {
    /// Grab the next frame
    ///
    /// # Errors
    /// - The device stopped delivering frames
    fn read_frame(&mut self) -> Result<Frame>;

    /// Give the device back to the system
    fn release(&mut self) -> Result<()>;
}

/// A window that previews frames and reports key presses
pub trait PreviewWindow {
    /// Display a frame, drawing `overlay` text in the top-left corner when present
    fn show(&mut self, title: &str, frame: &Frame, overlay: Option<&str>) -> Result<()>;

    /// Wait up to `delay` for a key press
    fn wait_key(&mut self, delay: Duration) -> Result<Option<char>>;

    /// Close every preview window
    fn destroy_all(&mut self) -> Result<()>;
}

/// Factory opening capture sessions by device index
pub trait CaptureBackend {
    /// Open the camera at `device_index` together with a preview window
    ///
    /// # Errors
    /// - The device does not exist or cannot be opened
    fn open(&self, device_index: i32) -> Result<CaptureSession>;
}

/// Scoped camera + window pair
pub struct CaptureSession {
    camera: Box<dyn Camera>,
    window: Box<dyn PreviewWindow>,
    closed: bool,
}

impl CaptureSession {
    pub fn new(camera: Box<dyn Camera>, window: Box<dyn PreviewWindow>) -> Self {
        Self {
            camera,
            window,
            closed: false,
        }
    }

    pub fn read_frame(&mut self) -> Result<Frame> {
        self.camera.read_frame()
    }

    pub fn show(&mut self, title: &str, frame: &Frame, overlay: Option<&str>) -> Result<()> {
        self.window.show(title, frame, overlay)
    }

    pub fn wait_key(&mut self, delay: Duration) -> Result<Option<char>> {
        self.window.wait_key(delay)
    }

    /// Release the camera and close the windows, reporting failures
    ///
    /// Both steps always run; the first failure is returned.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        let released = self.camera.release();
        let destroyed = self.window.destroy_all();
        released.and(destroyed)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.camera.release() {
            log::warn!("Failed to release camera: {}", e);
        }
        if let Err(e) = self.window.destroy_all() {
            log::warn!("Failed to close preview windows: {}", e);
        }
    }
}

/// Backend used when no camera support was compiled in
#[derive(Debug, Default)]
pub struct UnavailableBackend;

impl CaptureBackend for UnavailableBackend {
    fn open(&self, device_index: i32) -> Result<CaptureSession> {
        Err(RpsError::unsupported(format!(
            "cannot open camera {}: webcam support requires the `opencv` feature",
            device_index
        )))
    }
}

/// The capture backend compiled into this build
#[must_use]
pub fn default_backend() -> Box<dyn CaptureBackend> {
    #[cfg(feature = "opencv")]
    {
        Box::new(OpenCvBackend::default())
    }
    #[cfg(not(feature = "opencv"))]
    {
        Box::new(UnavailableBackend)
    }
}
