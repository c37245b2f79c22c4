use thiserror::Error;

/// Failure kinds of the capture pipeline.
///
/// Apart from `ServiceStopped`, none of these reach a caller: they are logged
/// and mapped to a fallback (session revert, or "no composite").
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    #[error("no label found")]
    NoLabelFound,

    #[error("segmenter unavailable")]
    SegmenterUnavailable,

    #[error("dimension mismatch: image {image:?}, mask {mask:?}")]
    DimensionMismatch { image: (u32, u32), mask: (u32, u32) },

    #[error("{stage} stage failed: {reason}")]
    StageFailed { stage: &'static str, reason: String },

    #[error("capture service has stopped")]
    ServiceStopped,
}
