mod align;
mod compositor;
#[cfg(feature = "onnx")]
mod onnx;
mod preprocess;
mod processor;
pub mod types;

pub use align::MaskAligner;
pub use compositor::{extract_foreground, Compositor, Layer, LAYER_ORDER};
#[cfg(feature = "onnx")]
pub use onnx::OnnxSegmenter;
pub use preprocess::{categories_from_scores, Preprocessor};
pub use processor::SubjectProcessor;
pub use types::{AlphaMask, CategoryMask, Segmenter};

#[cfg(feature = "onnx")]
use anyhow::Result;
#[cfg(feature = "onnx")]
use std::sync::Arc;

/// Native resolution of the default subject segmenter.
pub const DEFAULT_SEGMENTER_SIZE: (u32, u32) = (256, 256);

/// Create the default segmentation model
#[cfg(feature = "onnx")]
pub fn create_default_segmenter(model_path: &str) -> Result<Arc<dyn Segmenter>> {
    let (width, height) = DEFAULT_SEGMENTER_SIZE;
    let model = OnnxSegmenter::new(model_path, width, height)?;
    Ok(Arc::new(model))
}
