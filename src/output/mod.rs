mod file_output;

pub use file_output::ImageFileOutput;

use anyhow::Result;
use image::RgbaImage;

/// Trait for output destinations
pub trait OutputSink {
    /// Write the displayable image of a capture
    fn write_image(&mut self, image: &RgbaImage) -> Result<()>;
}
