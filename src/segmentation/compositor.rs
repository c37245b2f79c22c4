use super::types::AlphaMask;
use crate::config::{CompositorConfig, LayerStyle};
use crate::error::CaptureError;
use image::{imageops, GrayImage, Rgba, RgbaImage};

/// Layers of the composite, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Wide, dim white halo.
    Glow,
    /// Tight, bright white rim.
    Outline,
    /// Sharp subject pixels.
    Foreground,
}

/// Draw order of the composite. Each layer is blended source-over onto the
/// previous ones.
pub const LAYER_ORDER: [Layer; 3] = [Layer::Glow, Layer::Outline, Layer::Foreground];

const WHITE: [u8; 3] = [255, 255, 255];

/// Renders a glow + outline + foreground composite of a segmented subject.
///
/// `compose` is a pure function of its inputs: the same image and mask always
/// produce the same bytes, or both produce `None`.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    config: CompositorConfig,
}

impl Compositor {
    pub fn new(config: CompositorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Composite `image` through `alpha`.
    ///
    /// Returns `None` when coverage is below the configured threshold (the
    /// threshold itself is accepted), or when the inputs cannot be composited
    /// at all. Callers fall back to the unmodified image in that case.
    pub fn compose(&self, image: &RgbaImage, alpha: &AlphaMask) -> Option<RgbaImage> {
        let _span = tracing::debug_span!("compose").entered();

        if let Err(err) = check_dimensions(image, alpha) {
            tracing::warn!("Skipping composite: {}", err);
            return None;
        }

        let foreground = extract_foreground(image, alpha);

        let coverage = self.coverage(&foreground);
        if coverage < self.config.coverage_threshold {
            tracing::debug!(
                "Foreground coverage {:.4} below {:.4}, no composite",
                coverage,
                self.config.coverage_threshold
            );
            return None;
        }
        tracing::debug!("Foreground coverage {:.4}", coverage);

        let silhouette = silhouette(&foreground);
        let (width, height) = image.dimensions();
        let mut canvas = RgbaImage::new(width, height);

        for layer in LAYER_ORDER {
            match layer {
                Layer::Glow => draw_blurred(&mut canvas, &silhouette, &self.config.glow),
                Layer::Outline => draw_blurred(&mut canvas, &silhouette, &self.config.outline),
                Layer::Foreground => draw_image(&mut canvas, &foreground),
            }
        }

        Some(canvas)
    }

    /// Fraction of pixels whose alpha is above the noise floor.
    pub fn coverage(&self, foreground: &RgbaImage) -> f64 {
        let total = foreground.width() as u64 * foreground.height() as u64;
        if total == 0 {
            return 0.0;
        }
        let opaque = foreground
            .pixels()
            .filter(|p| p[3] > self.config.noise_floor)
            .count() as u64;
        opaque as f64 / total as f64
    }
}

fn check_dimensions(image: &RgbaImage, alpha: &AlphaMask) -> Result<(), CaptureError> {
    let (width, height) = image.dimensions();
    if image.dimensions() != alpha.dimensions() || width == 0 || height == 0 {
        return Err(CaptureError::DimensionMismatch {
            image: image.dimensions(),
            mask: alpha.dimensions(),
        });
    }
    Ok(())
}

/// Keep the original color where the mask is set, transparent elsewhere.
pub fn extract_foreground(image: &RgbaImage, alpha: &AlphaMask) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let mask = alpha.alpha(x, y) as u16;
        if mask == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let pixel = image.get_pixel(x, y);
        let a = (pixel[3] as u16 * mask / 255) as u8;
        Rgba([pixel[0], pixel[1], pixel[2], a])
    })
}

/// Alpha channel of the foreground. The silhouette color is always white.
fn silhouette(foreground: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(foreground.width(), foreground.height(), |x, y| {
        image::Luma([foreground.get_pixel(x, y)[3]])
    })
}

fn draw_blurred(canvas: &mut RgbaImage, silhouette: &GrayImage, style: &LayerStyle) {
    let sigma = style.sigma();
    let blurred = if sigma > 0.0 {
        imageops::blur(silhouette, sigma)
    } else {
        silhouette.clone()
    };
    let opacity = style.opacity as f32 / 255.0;

    for (x, y, dst) in canvas.enumerate_pixels_mut() {
        let a = blurred.get_pixel(x, y)[0] as f32 / 255.0 * opacity;
        source_over(dst, WHITE, a);
    }
}

fn draw_image(canvas: &mut RgbaImage, layer: &RgbaImage) {
    for (x, y, dst) in canvas.enumerate_pixels_mut() {
        let src = layer.get_pixel(x, y);
        source_over(dst, [src[0], src[1], src[2]], src[3] as f32 / 255.0);
    }
}

/// Straight-alpha source-over blend of `color` at alpha `src_a` onto `dst`.
fn source_over(dst: &mut Rgba<u8>, color: [u8; 3], src_a: f32) {
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let src_c = color[c] as f32;
        let dst_c = dst[c] as f32;
        let out_c = (src_c * src_a + dst_c * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = out_c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_over_opaque_source_replaces() {
        let mut dst = Rgba([255, 255, 255, 200]);
        source_over(&mut dst, [10, 20, 30], 1.0);
        assert_eq!(dst, Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn source_over_onto_transparent_keeps_color() {
        let mut dst = Rgba([0, 0, 0, 0]);
        source_over(&mut dst, [255, 255, 255], 0.5);
        assert_eq!(dst, Rgba([255, 255, 255, 128]));
    }

    #[test]
    fn source_over_accumulates_alpha() {
        let mut dst = Rgba([255, 255, 255, 100]);
        source_over(&mut dst, [255, 255, 255], 0.6);
        assert_eq!(dst[3], 193);
        assert_eq!(&dst.0[..3], &[255, 255, 255]);
    }

    #[test]
    fn extract_foreground_clears_background() {
        let image = RgbaImage::from_pixel(2, 1, Rgba([9, 8, 7, 255]));
        let alpha = AlphaMask::from_fn(2, 1, |x, _| x == 1);
        let fg = extract_foreground(&image, &alpha);
        assert_eq!(fg.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(fg.get_pixel(1, 0), &Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn coverage_ignores_noise_alpha() {
        let mut fg = RgbaImage::new(10, 1);
        fg.put_pixel(0, 0, Rgba([0, 0, 0, 32]));
        fg.put_pixel(1, 0, Rgba([0, 0, 0, 33]));
        let compositor = Compositor::default();
        assert!((compositor.coverage(&fg) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn mismatched_dimensions_yield_none() {
        let image = RgbaImage::from_pixel(10, 10, Rgba([1, 2, 3, 255]));
        let alpha = AlphaMask::from_fn(10, 9, |_, _| true);
        assert!(Compositor::default().compose(&image, &alpha).is_none());
    }

    #[test]
    fn zero_sized_image_yields_none() {
        let image = RgbaImage::new(0, 0);
        let alpha = AlphaMask::empty(0, 0);
        assert!(Compositor::default().compose(&image, &alpha).is_none());
    }

    #[test]
    fn layer_order_is_glow_outline_foreground() {
        assert_eq!(LAYER_ORDER, [Layer::Glow, Layer::Outline, Layer::Foreground]);
    }
}
