use super::{rank_labels, Label, Recognizer};
use crate::segmentation::Preprocessor;
use anyhow::{anyhow, bail, Context, Result};
use image::RgbaImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Image classifier loaded from an ONNX file plus a newline-separated
/// labels file.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    preprocessor: Preprocessor,
    labels: Vec<String>,
    min_confidence: f32,
}

impl OnnxClassifier {
    pub fn new<P: AsRef<Path>, L: AsRef<Path>>(
        model_path: P,
        labels_path: L,
        min_confidence: f32,
    ) -> Result<Self> {
        let path = model_path.as_ref();
        let labels_path = labels_path.as_ref();

        tracing::info!("Loading classifier from {}", path.display());

        let labels: Vec<String> = std::fs::read_to_string(labels_path)
            .with_context(|| format!("Failed to read labels from {}", labels_path.display()))?
            .lines()
            .map(|line| line.trim().to_string())
            .collect();

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("Classifier loaded with {} labels", labels.len());

        Ok(Self {
            session: Mutex::new(session),
            preprocessor: Preprocessor::new(224, 224).with_normalization(IMAGENET_MEAN, IMAGENET_STD),
            labels,
            min_confidence,
        })
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|v| v / sum).collect()
}

impl Recognizer for OnnxClassifier {
    fn recognize(&self, image: &RgbaImage) -> Result<Vec<Label>> {
        let input = self.preprocessor.preprocess(image);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("classifier session poisoned"))?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = session
            .run(ort::inputs![TensorRef::from_array_view(&input)?])
            .context("Failed to run inference")?;

        let (_, logits) = outputs[0].try_extract_tensor::<f32>()?;
        if logits.len() != self.labels.len() {
            bail!(
                "classifier produced {} scores for {} labels",
                logits.len(),
                self.labels.len()
            );
        }

        Ok(rank_labels(&softmax(logits), &self.labels, self.min_confidence))
    }
}
