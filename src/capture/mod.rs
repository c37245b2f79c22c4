mod file_capture;
#[cfg(feature = "webcam")]
mod v4l_capture;

pub use file_capture::FileCapture;
#[cfg(feature = "webcam")]
pub use v4l_capture::WebcamCapture;

use anyhow::Result;
use image::RgbaImage;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Take a single photo
    fn capture_frame(&mut self) -> Result<RgbaImage>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}
