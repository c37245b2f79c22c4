use super::types::{AlphaMask, CategoryMask};
use crate::config::MaskFilter;
use image::imageops;

/// Upscales category masks to image resolution and binarizes them.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskAligner {
    filter: MaskFilter,
}

impl MaskAligner {
    pub fn new(filter: MaskFilter) -> Self {
        Self { filter }
    }

    /// Align `mask` to `target_width` x `target_height`.
    ///
    /// Every non-zero category becomes opaque, category 0 transparent. With
    /// bilinear resampling a pixel is opaque when the interpolated category
    /// is still non-zero after rounding. An empty mask yields a fully
    /// transparent result.
    pub fn align(&self, mask: &CategoryMask, target_width: u32, target_height: u32) -> AlphaMask {
        let _span = tracing::debug_span!("align").entered();

        if mask.is_empty() {
            tracing::debug!("Empty category mask, aligning to transparent");
            return AlphaMask::empty(target_width, target_height);
        }

        let filter = match self.filter {
            MaskFilter::Nearest => imageops::FilterType::Nearest,
            MaskFilter::Bilinear => imageops::FilterType::Triangle,
        };

        // Collapse categories to {0, 255} first so interpolation runs between
        // background and foreground, not between category indices.
        let binary = AlphaMask::from_fn(mask.dimensions().0, mask.dimensions().1, |x, y| {
            mask.category(x, y) != 0
        });

        let scaled = if mask.dimensions() == (target_width, target_height) {
            binary.as_image().clone()
        } else {
            imageops::resize(binary.as_image(), target_width, target_height, filter)
        };

        AlphaMask::from_fn(target_width, target_height, |x, y| {
            scaled.get_pixel(x, y)[0] > 0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadrant_mask() -> CategoryMask {
        // Top-left background, others foreground with distinct categories
        CategoryMask::from_raw(2, 2, vec![0, 1, 2, 7]).unwrap()
    }

    #[test]
    fn nearest_upscale_preserves_quadrants() {
        let alpha = MaskAligner::new(MaskFilter::Nearest).align(&quadrant_mask(), 4, 4);
        assert_eq!(alpha.dimensions(), (4, 4));
        for y in 0..4 {
            for x in 0..4 {
                let expected = !(x < 2 && y < 2);
                assert_eq!(alpha.is_opaque(x, y), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn output_matches_target_even_for_non_integer_scale() {
        let alpha = MaskAligner::new(MaskFilter::Bilinear).align(&quadrant_mask(), 37, 23);
        assert_eq!(alpha.dimensions(), (37, 23));
        assert!(alpha
            .as_image()
            .pixels()
            .all(|p| p[0] == AlphaMask::OPAQUE || p[0] == AlphaMask::TRANSPARENT));
        assert!(alpha.is_opaque(36, 22));
        assert!(!alpha.is_opaque(0, 0));
    }

    #[test]
    fn all_background_stays_transparent() {
        let mask = CategoryMask::from_raw(3, 3, vec![0; 9]).unwrap();
        for filter in [MaskFilter::Nearest, MaskFilter::Bilinear] {
            let alpha = MaskAligner::new(filter).align(&mask, 30, 30);
            assert!(alpha.as_image().pixels().all(|p| p[0] == 0));
        }
    }

    #[test]
    fn empty_mask_aligns_to_transparent() {
        let mask = CategoryMask::from_raw(0, 0, Vec::new()).unwrap();
        let alpha = MaskAligner::default().align(&mask, 8, 6);
        assert_eq!(alpha.dimensions(), (8, 6));
        assert!(alpha.as_image().pixels().all(|p| p[0] == 0));
    }
}
