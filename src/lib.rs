//! Photo-to-vocabulary capture pipeline.
//!
//! A captured photo is recognized, its subject segmented, and a glow/outline
//! composite rendered for display, all driven by a single
//! [`session::CaptureService`].

pub mod capture;
pub mod config;
pub mod error;
pub mod output;
pub mod recognition;
pub mod segmentation;
pub mod session;
pub mod vocab;

pub use config::PipelineConfig;
pub use error::CaptureError;
