use super::types::CategoryMask;
use anyhow::{bail, Result};
use image::{imageops, RgbaImage};
use ndarray::Array4;

/// Preprocessor for stretching frames to a model's native resolution and
/// converting them to input tensors
#[derive(Debug, Clone)]
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            mean: [0.0; 3],
            std: [1.0; 3],
        }
    }

    /// Per-channel normalization applied after scaling to [0, 1].
    pub fn with_normalization(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Stretch to the exact target dimensions. Aspect ratio is not preserved
    /// and nothing is cropped.
    pub fn resize(&self, image: &RgbaImage) -> RgbaImage {
        if image.dimensions() == (self.target_width, self.target_height) {
            return image.clone();
        }
        imageops::resize(
            image,
            self.target_width,
            self.target_height,
            imageops::FilterType::Triangle,
        )
    }

    /// Preprocess an RGBA image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Stretch to target dimensions
    /// 2. Convert to float and scale to [0, 1]
    /// 3. Apply (x - mean) / std per channel
    /// 4. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, image: &RgbaImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized = self.resize(image);
        let (width, height) = resized.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (value - self.mean[c]) / self.std[c];
            }
        }

        tensor
    }
}

/// Decode model scores into a category mask.
///
/// `scores` is a flattened `[channels, height, width]` block. A single
/// channel is read as a foreground probability (category 1 above 0.5);
/// several channels are decoded by arg-max.
pub fn categories_from_scores(
    scores: &[f32],
    channels: usize,
    width: u32,
    height: u32,
) -> Result<CategoryMask> {
    let plane = width as usize * height as usize;
    if channels == 0 || scores.len() != channels * plane {
        bail!(
            "score buffer of length {} does not match {}x{}x{}",
            scores.len(),
            channels,
            width,
            height
        );
    }
    if channels > u8::MAX as usize + 1 {
        bail!("too many categories: {channels}");
    }

    let categories: Vec<u8> = (0..plane)
        .map(|i| {
            if channels == 1 {
                return u8::from(scores[i] > 0.5);
            }
            let mut best = 0;
            for c in 1..channels {
                if scores[c * plane + i] > scores[best * plane + i] {
                    best = c;
                }
            }
            best as u8
        })
        .collect();

    match CategoryMask::from_raw(width, height, categories) {
        Some(mask) => Ok(mask),
        None => bail!("category buffer does not match {width}x{height}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn resize_stretches_without_cropping() {
        let image = RgbaImage::from_pixel(640, 480, Rgba([10, 20, 30, 255]));
        let resized = Preprocessor::new(256, 256).resize(&image);
        assert_eq!(resized.dimensions(), (256, 256));
        assert_eq!(resized.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
        assert_eq!(resized.get_pixel(255, 255), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn preprocess_produces_normalized_nchw() {
        let image = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 51, 255]));
        let tensor = Preprocessor::new(4, 2).preprocess(&image);
        assert_eq!(tensor.shape(), &[1, 3, 2, 4]);
        assert_eq!(tensor[[0, 0, 1, 3]], 1.0);
        assert_eq!(tensor[[0, 1, 0, 0]], 0.0);
        assert!((tensor[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);

        let normalized = Preprocessor::new(4, 2)
            .with_normalization([0.5; 3], [0.5; 3])
            .preprocess(&image);
        assert_eq!(normalized[[0, 0, 0, 0]], 1.0);
        assert_eq!(normalized[[0, 1, 0, 0]], -1.0);
    }

    #[test]
    fn single_channel_scores_threshold_at_half() {
        let mask = categories_from_scores(&[0.1, 0.9, 0.5, 0.51], 1, 2, 2).unwrap();
        assert_eq!(mask.category(0, 0), 0);
        assert_eq!(mask.category(1, 0), 1);
        assert_eq!(mask.category(0, 1), 0);
        assert_eq!(mask.category(1, 1), 1);
    }

    #[test]
    fn multi_channel_scores_use_argmax() {
        // 3 channels over a 2x1 plane
        let scores = [0.9, 0.1, 0.05, 0.2, 0.05, 0.7];
        let mask = categories_from_scores(&scores, 3, 2, 1).unwrap();
        assert_eq!(mask.category(0, 0), 0);
        assert_eq!(mask.category(1, 0), 2);
    }

    #[test]
    fn mismatched_scores_are_rejected() {
        assert!(categories_from_scores(&[0.0; 3], 1, 2, 2).is_err());
        assert!(categories_from_scores(&[], 0, 0, 0).is_err());
    }
}
