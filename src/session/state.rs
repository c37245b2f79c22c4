use crate::error::CaptureError;
use crate::recognition::Label;
use crate::vocab::Lexicon;
use anyhow::Result;
use image::RgbaImage;
use std::sync::Arc;

/// Identifies one capture attempt. Stage results carry it so that results
/// for an abandoned attempt can be recognized and dropped.
pub type SessionId = u64;

/// Everything shown once a capture has been processed.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub image: Arc<RgbaImage>,
    /// `None` means "show the original capture".
    pub composite: Option<Arc<RgbaImage>>,
    pub label: String,
    pub translation: String,
    pub phonetic: String,
}

impl CaptureResult {
    /// The composite if there is one, otherwise the unmodified capture.
    pub fn displayable(&self) -> &Arc<RgbaImage> {
        self.composite.as_ref().unwrap_or(&self.image)
    }
}

/// Entry handed to the word store when a result is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedEntry {
    pub label: String,
    pub translation: String,
}

#[derive(Debug, Clone)]
struct Recognized {
    label: String,
    translation: String,
    phonetic: String,
}

#[derive(Debug)]
enum SessionState {
    Idle,
    Processing {
        id: SessionId,
        image: Arc<RgbaImage>,
        recognized: Option<Recognized>,
    },
    Result(CaptureResult),
}

/// Read-only view of the session for observers.
#[derive(Debug, Clone)]
pub enum SessionSnapshot {
    Idle,
    Processing {
        /// Known once recognition has succeeded.
        label: Option<String>,
    },
    Result(CaptureResult),
}

impl SessionSnapshot {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionSnapshot::Idle)
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, SessionSnapshot::Processing { .. })
    }

    pub fn result(&self) -> Option<&CaptureResult> {
        match self {
            SessionSnapshot::Result(result) => Some(result),
            _ => None,
        }
    }
}

/// Capture lifecycle: `Idle -> Processing -> Result -> Idle`.
///
/// Only recognition failures revert `Processing` to `Idle`. Every
/// segmentation outcome ends in `Result`.
#[derive(Debug)]
pub struct CaptureSession {
    state: SessionState,
    last_id: SessionId,
    lexicon: Lexicon,
}

impl CaptureSession {
    pub fn new(lexicon: Lexicon) -> Self {
        Self {
            state: SessionState::Idle,
            last_id: 0,
            lexicon,
        }
    }

    /// Start processing `image`. Ignored unless idle.
    ///
    /// Returns the new session id and a shared handle to the image for the
    /// recognition stage.
    pub fn capture(&mut self, image: RgbaImage) -> Option<(SessionId, Arc<RgbaImage>)> {
        if !matches!(self.state, SessionState::Idle) {
            tracing::debug!("Capture ignored, session busy");
            return None;
        }
        self.last_id += 1;
        let id = self.last_id;
        let image = Arc::new(image);
        tracing::info!(
            "Capture {} started ({}x{})",
            id,
            image.width(),
            image.height()
        );
        self.state = SessionState::Processing {
            id,
            image: Arc::clone(&image),
            recognized: None,
        };
        Some((id, image))
    }

    /// Apply a recognition outcome.
    ///
    /// On success the top label is retained and the image is returned for
    /// segmentation. On failure or an empty label list the session reverts to
    /// idle. Outcomes for any other session are dropped.
    pub fn recognition_finished(
        &mut self,
        id: SessionId,
        outcome: Result<Vec<Label>>,
    ) -> Option<Arc<RgbaImage>> {
        let SessionState::Processing {
            id: current,
            image,
            recognized,
        } = &mut self.state
        else {
            tracing::debug!("Dropping recognition for {}: not processing", id);
            return None;
        };
        if *current != id || recognized.is_some() {
            tracing::debug!("Dropping stale recognition for {}", id);
            return None;
        }

        let top = match outcome {
            Ok(labels) => labels.into_iter().next().ok_or(CaptureError::NoLabelFound),
            Err(err) => Err(CaptureError::RecognizerUnavailable(format!("{err:#}"))),
        };

        match top {
            Ok(label) => {
                let text = label.text.trim().to_lowercase();
                let entry = self.lexicon.lookup(&text);
                tracing::info!(
                    "Capture {} recognized '{}' ({:.2})",
                    id,
                    text,
                    label.confidence
                );
                *recognized = Some(Recognized {
                    label: text,
                    translation: entry.translation,
                    phonetic: entry.phonetic,
                });
                Some(Arc::clone(image))
            }
            Err(err) => {
                tracing::info!("Capture {} reverted: {}", id, err);
                self.state = SessionState::Idle;
                None
            }
        }
    }

    /// Apply a segmentation outcome. `composite` of `None` keeps the original
    /// image as the displayable one. Returns whether the session moved to
    /// `Result`.
    pub fn segmentation_finished(&mut self, id: SessionId, composite: Option<RgbaImage>) -> bool {
        let SessionState::Processing {
            id: current,
            image,
            recognized,
        } = &self.state
        else {
            tracing::debug!("Dropping composite for {}: not processing", id);
            return false;
        };
        if *current != id {
            tracing::debug!("Dropping stale composite for {}", id);
            return false;
        }
        let Some(recognized) = recognized.clone() else {
            tracing::warn!("Composite for {} arrived before its label, dropped", id);
            return false;
        };

        tracing::info!(
            "Capture {} ready ({})",
            id,
            if composite.is_some() {
                "composited"
            } else {
                "original image"
            }
        );
        self.state = SessionState::Result(CaptureResult {
            image: Arc::clone(image),
            composite: composite.map(Arc::new),
            label: recognized.label,
            translation: recognized.translation,
            phonetic: recognized.phonetic,
        });
        true
    }

    /// Leave `Result` and hand back the entry to store.
    pub fn accept(&mut self) -> Option<AcceptedEntry> {
        let SessionState::Result(result) = &self.state else {
            return None;
        };
        let entry = AcceptedEntry {
            label: result.label.clone(),
            translation: result.translation.clone(),
        };
        self.state = SessionState::Idle;
        Some(entry)
    }

    /// Drop the result and return to the viewfinder.
    pub fn retake(&mut self) -> bool {
        self.leave_result()
    }

    pub fn discard(&mut self) -> bool {
        self.leave_result()
    }

    /// Navigate away. Unlike the other exits this also abandons an in-flight
    /// capture; its results are dropped when they arrive.
    pub fn back(&mut self) -> bool {
        match self.state {
            SessionState::Idle => false,
            SessionState::Processing { id, .. } => {
                tracing::info!("Capture {} abandoned", id);
                self.state = SessionState::Idle;
                true
            }
            SessionState::Result(_) => self.leave_result(),
        }
    }

    fn leave_result(&mut self) -> bool {
        if matches!(self.state, SessionState::Result(_)) {
            self.state = SessionState::Idle;
            true
        } else {
            false
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        match &self.state {
            SessionState::Idle => SessionSnapshot::Idle,
            SessionState::Processing { recognized, .. } => SessionSnapshot::Processing {
                label: recognized.as_ref().map(|r| r.label.clone()),
            },
            SessionState::Result(result) => SessionSnapshot::Result(result.clone()),
        }
    }
}
