use super::OutputSink;
use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// Writes images as PNG, keeping transparency.
pub struct ImageFileOutput {
    path: PathBuf,
}

impl ImageFileOutput {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl OutputSink for ImageFileOutput {
    fn write_image(&mut self, image: &RgbaImage) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        image
            .save_with_format(&self.path, image::ImageFormat::Png)
            .with_context(|| format!("Failed to write image to {}", self.path.display()))?;

        tracing::info!(
            "Wrote {}x{} image to {}",
            image.width(),
            image.height(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_round_trip_keeps_alpha() {
        let dir = std::env::temp_dir().join(format!("paici-output-{}", std::process::id()));
        let path = dir.join("nested").join("composite.png");
        let image = RgbaImage::from_pixel(3, 2, Rgba([255, 255, 255, 90]));

        ImageFileOutput::new(&path).write_image(&image).unwrap();
        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(reloaded, image);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
