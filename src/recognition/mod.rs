#[cfg(feature = "onnx")]
mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

use anyhow::Result;
use image::RgbaImage;

/// One recognized label.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub confidence: f32,
}

impl Label {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Trait for label recognition capabilities
pub trait Recognizer: Send + Sync {
    /// Classify a captured image.
    ///
    /// # Returns
    /// * Labels ordered by descending confidence, already filtered to the
    ///   configured minimum. An empty list means nothing was recognized.
    fn recognize(&self, image: &RgbaImage) -> Result<Vec<Label>>;
}

/// Filter `scores` to `min_confidence`, pair them with `names` and sort by
/// descending confidence. Names are lowercased.
pub fn rank_labels(scores: &[f32], names: &[String], min_confidence: f32) -> Vec<Label> {
    let mut labels: Vec<Label> = scores
        .iter()
        .zip(names)
        .filter(|(score, _)| **score >= min_confidence)
        .map(|(score, name)| Label::new(name.trim().to_lowercase(), *score))
        .collect();
    labels.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    labels
}

/// Always reports the same label. Used when the label is supplied by hand.
#[derive(Debug, Clone)]
pub struct StaticRecognizer {
    label: String,
}

impl StaticRecognizer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Recognizer for StaticRecognizer {
    fn recognize(&self, _image: &RgbaImage) -> Result<Vec<Label>> {
        let text = self.label.trim().to_lowercase();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Label::new(text, 1.0)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rank_labels_filters_and_sorts() {
        let labels = rank_labels(&[0.1, 0.7, 0.9, 0.65], &names(&["Cat", "Dog", "Apple", "Cup"]), 0.65);
        let texts: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["apple", "dog", "cup"]);
    }

    #[test]
    fn rank_labels_may_be_empty() {
        assert!(rank_labels(&[0.2, 0.3], &names(&["a", "b"]), 0.65).is_empty());
    }

    #[test]
    fn static_recognizer_lowercases() {
        let image = RgbaImage::new(1, 1);
        let labels = StaticRecognizer::new(" Banana ").recognize(&image).unwrap();
        assert_eq!(labels, vec![Label::new("banana", 1.0)]);
        assert!(StaticRecognizer::new("  ").recognize(&image).unwrap().is_empty());
    }
}
