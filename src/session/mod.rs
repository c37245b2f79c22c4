mod service;
mod state;

pub use service::{Capabilities, CaptureService, Collaborators};
pub use state::{AcceptedEntry, CaptureResult, CaptureSession, SessionId, SessionSnapshot};
