use anyhow::Result;
use image::{GrayImage, Luma, RgbaImage};

/// Per-pixel category indices at the segmenter's native resolution.
/// Category 0 is background; anything else is foreground.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMask(GrayImage);

impl CategoryMask {
    pub fn new(categories: GrayImage) -> Self {
        Self(categories)
    }

    /// Build from row-major category indices. Returns `None` if the buffer
    /// length does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, categories: Vec<u8>) -> Option<Self> {
        GrayImage::from_raw(width, height, categories).map(Self)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        let (width, height) = self.dimensions();
        width == 0 || height == 0
    }

    pub fn category(&self, x: u32, y: u32) -> u8 {
        self.0.get_pixel(x, y)[0]
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }
}

/// Binary opacity buffer at full image resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMask(GrayImage);

impl AlphaMask {
    pub const OPAQUE: u8 = 255;
    pub const TRANSPARENT: u8 = 0;

    /// Fully transparent mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    /// Build a mask from a predicate; `true` marks an opaque pixel.
    pub fn from_fn(width: u32, height: u32, mut opaque: impl FnMut(u32, u32) -> bool) -> Self {
        Self(GrayImage::from_fn(width, height, |x, y| {
            Luma([if opaque(x, y) {
                Self::OPAQUE
            } else {
                Self::TRANSPARENT
            }])
        }))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.0.get_pixel(x, y)[0]
    }

    pub fn is_opaque(&self, x: u32, y: u32) -> bool {
        self.alpha(x, y) == Self::OPAQUE
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }
}

/// Trait for segmentation capabilities.
/// Allows swapping between different backends (ONNX models, test doubles, ...)
///
/// Implementations are stateless per call; a single instance is shared across
/// sessions, but the capture service never calls it concurrently.
pub trait Segmenter: Send + Sync {
    /// Segment a frame already stretched to [`Segmenter::input_size`].
    ///
    /// # Returns
    /// * Category mask at the native resolution
    fn segment(&self, frame: &RgbaImage) -> Result<CategoryMask>;

    /// Native (width, height) the capability expects.
    fn input_size(&self) -> (u32, u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_rejects_wrong_length() {
        assert!(CategoryMask::from_raw(2, 2, vec![0, 1, 2]).is_none());
        let mask = CategoryMask::from_raw(2, 1, vec![0, 3]).unwrap();
        assert_eq!(mask.category(1, 0), 3);
        assert!(!mask.is_empty());
    }

    #[test]
    fn alpha_mask_from_fn_is_binary() {
        let mask = AlphaMask::from_fn(4, 4, |x, _| x < 2);
        assert!(mask.is_opaque(0, 3));
        assert_eq!(mask.alpha(3, 0), AlphaMask::TRANSPARENT);
        assert!(mask
            .as_image()
            .pixels()
            .all(|p| p[0] == AlphaMask::OPAQUE || p[0] == AlphaMask::TRANSPARENT));
    }
}
