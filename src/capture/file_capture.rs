use super::CaptureSource;
use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// Reads a still photo from disk on every shutter press.
pub struct FileCapture {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl FileCapture {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (width, height) = image::image_dimensions(&path)
            .with_context(|| format!("Failed to read image header from {}", path.display()))?;

        tracing::info!("Using {} as capture source ({}x{})", path.display(), width, height);

        Ok(Self {
            path,
            width,
            height,
        })
    }
}

impl CaptureSource for FileCapture {
    fn capture_frame(&mut self) -> Result<RgbaImage> {
        let decoded = image::open(&self.path)
            .with_context(|| format!("Failed to decode {}", self.path.display()))?;
        Ok(decoded.to_rgba8())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
