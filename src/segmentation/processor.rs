use super::align::MaskAligner;
use super::compositor::Compositor;
use super::preprocess::Preprocessor;
use super::types::Segmenter;
use crate::config::PipelineConfig;
use crate::error::CaptureError;
use image::RgbaImage;
use std::sync::Arc;

/// Runs segmentation and compositing for one captured image.
///
/// If the segmenter could not be initialized, every call yields `None`,
/// mirroring passthrough mode when no model is loaded.
pub struct SubjectProcessor {
    segmenter: Option<Arc<dyn Segmenter>>,
    aligner: MaskAligner,
    compositor: Compositor,
}

impl SubjectProcessor {
    pub fn new(segmenter: Option<Arc<dyn Segmenter>>, config: &PipelineConfig) -> Self {
        if segmenter.is_none() {
            tracing::warn!("{}; composites disabled", CaptureError::SegmenterUnavailable);
        }
        Self {
            segmenter,
            aligner: MaskAligner::new(config.mask_filter),
            compositor: Compositor::new(config.compositor.clone()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.segmenter.is_some()
    }

    /// Composite of `image`, or `None` to display it unmodified.
    pub fn process(&self, image: &RgbaImage) -> Option<RgbaImage> {
        let segmenter = self.segmenter.as_ref()?;
        let _span = tracing::debug_span!("segment").entered();

        let (native_width, native_height) = segmenter.input_size();
        let scaled = Preprocessor::new(native_width, native_height).resize(image);

        let mask = match segmenter.segment(&scaled) {
            Ok(mask) => mask,
            Err(err) => {
                tracing::warn!("Segmentation failed, showing original: {:#}", err);
                return None;
            }
        };
        tracing::debug!("Category mask {:?}", mask.dimensions());

        let (width, height) = image.dimensions();
        let alpha = self.aligner.align(&mask, width, height);
        self.compositor.compose(image, &alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::types::CategoryMask;
    use anyhow::Result;
    use image::Rgba;
    use std::sync::Mutex;

    /// Marks the centre half of the native frame as foreground and records
    /// the frame sizes it was given.
    struct CentreSegmenter {
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl Segmenter for CentreSegmenter {
        fn segment(&self, frame: &RgbaImage) -> Result<CategoryMask> {
            self.seen.lock().unwrap().push(frame.dimensions());
            let (w, h) = frame.dimensions();
            let data = (0..h)
                .flat_map(|y| (0..w).map(move |x| (x, y)))
                .map(|(x, y)| u8::from(x >= w / 4 && x < 3 * w / 4 && y >= h / 4 && y < 3 * h / 4))
                .collect();
            Ok(CategoryMask::from_raw(w, h, data).unwrap())
        }

        fn input_size(&self) -> (u32, u32) {
            (16, 16)
        }
    }

    struct FailingSegmenter;

    impl Segmenter for FailingSegmenter {
        fn segment(&self, _frame: &RgbaImage) -> Result<CategoryMask> {
            anyhow::bail!("model crashed")
        }

        fn input_size(&self) -> (u32, u32) {
            (16, 16)
        }
    }

    fn photo() -> RgbaImage {
        RgbaImage::from_pixel(64, 48, Rgba([200, 40, 40, 255]))
    }

    #[test]
    fn frame_is_stretched_to_native_size() {
        let segmenter = Arc::new(CentreSegmenter {
            seen: Mutex::new(Vec::new()),
        });
        let processor = SubjectProcessor::new(Some(segmenter.clone()), &PipelineConfig::default());
        let composite = processor.process(&photo()).expect("centre subject composites");
        assert_eq!(composite.dimensions(), (64, 48));
        assert_eq!(segmenter.seen.lock().unwrap().as_slice(), &[(16, 16)]);
        assert_eq!(composite.get_pixel(32, 24), &Rgba([200, 40, 40, 255]));
    }

    #[test]
    fn unavailable_segmenter_never_composites() {
        let processor = SubjectProcessor::new(None, &PipelineConfig::default());
        assert!(!processor.is_available());
        assert!(processor.process(&photo()).is_none());
    }

    #[test]
    fn segmentation_failure_falls_back() {
        let processor =
            SubjectProcessor::new(Some(Arc::new(FailingSegmenter)), &PipelineConfig::default());
        assert!(processor.process(&photo()).is_none());
    }
}
