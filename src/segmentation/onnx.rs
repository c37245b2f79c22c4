use super::preprocess::{categories_from_scores, Preprocessor};
use super::types::{CategoryMask, Segmenter};
use anyhow::{anyhow, bail, Context, Result};
use image::RgbaImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;

/// Subject segmentation model loaded from an ONNX file.
///
/// Expects a `[1, 3, H, W]` input in [0, 1] and produces either a single
/// probability plane or one score plane per category.
pub struct OnnxSegmenter {
    session: Mutex<Session>,
    preprocessor: Preprocessor,
}

impl OnnxSegmenter {
    /// Load a segmenter with the given native input size.
    ///
    /// # Default Configuration
    /// - Input size: 256x256 for selfie/subject models
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading segmentation model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("Segmentation model loaded successfully");

        Ok(Self {
            session: Mutex::new(session),
            preprocessor: Preprocessor::new(width, height),
        })
    }
}

impl Segmenter for OnnxSegmenter {
    fn segment(&self, frame: &RgbaImage) -> Result<CategoryMask> {
        let input = self.preprocessor.preprocess(frame);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("segmentation session poisoned"))?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = session
            .run(ort::inputs![TensorRef::from_array_view(&input)?])
            .context("Failed to run inference")?;

        let (shape, scores) = outputs[0].try_extract_tensor::<f32>()?;

        // Expect [1, C, H, W]
        if shape.len() != 4 {
            bail!("unexpected segmentation output shape {:?}", shape);
        }
        let channels = shape[1] as usize;
        let height = shape[2] as u32;
        let width = shape[3] as u32;

        categories_from_scores(scores, channels, width, height)
    }

    fn input_size(&self) -> (u32, u32) {
        self.preprocessor.target_size()
    }
}
