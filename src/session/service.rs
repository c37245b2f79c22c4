use super::state::{AcceptedEntry, CaptureSession, SessionId, SessionSnapshot};
use crate::error::CaptureError;
use crate::recognition::{Label, Recognizer};
use crate::segmentation::SubjectProcessor;
use crate::vocab::{Translator, WordId, WordStore, MISSING_TRANSLATION};
use anyhow::Result;
use image::RgbaImage;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// External capabilities the pipeline calls into.
pub struct Capabilities {
    /// `None` if the recognizer could not be initialized; every capture then
    /// reverts to idle.
    pub recognizer: Option<Arc<dyn Recognizer>>,
    pub processor: Arc<SubjectProcessor>,
}

/// Vocabulary collaborators notified on accept and edit.
pub struct Collaborators {
    pub store: Arc<dyn WordStore>,
    pub translator: Option<Arc<dyn Translator>>,
}

enum Command {
    Capture {
        image: RgbaImage,
        reply: oneshot::Sender<Option<SessionId>>,
    },
    Accept,
    Retake,
    Discard,
    Back,
    EditTranslation {
        id: WordId,
        translation: String,
    },
}

enum Job {
    Recognize { id: SessionId, image: Arc<RgbaImage> },
    Segment { id: SessionId, image: Arc<RgbaImage> },
}

enum StageEvent {
    Recognized {
        id: SessionId,
        outcome: Result<Vec<Label>>,
    },
    Segmented {
        id: SessionId,
        composite: Option<RgbaImage>,
    },
}

/// Owns the single capture session and sequences its stages.
///
/// Commands and stage results are delivered to one actor task, which is the
/// only writer of the session. Capability calls run one at a time on a worker
/// task, so a capability is never invoked concurrently even when an abandoned
/// capture is still finishing.
pub struct CaptureService {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    actor: JoinHandle<()>,
}

impl CaptureService {
    /// Start the service. Must be called from within a tokio runtime.
    pub fn spawn(
        session: CaptureSession,
        capabilities: Capabilities,
        collaborators: Collaborators,
    ) -> Self {
        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        let (job_sender, job_receiver) = mpsc::unbounded_channel();
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let (snapshot_sender, snapshots) = watch::channel(session.snapshot());

        tokio::spawn(run_worker(job_receiver, event_sender, capabilities));

        let actor = Actor {
            session,
            jobs: job_sender,
            snapshots: snapshot_sender,
            store: collaborators.store,
            translator: collaborators.translator,
        };
        let actor = tokio::spawn(actor.run(command_receiver, event_receiver));

        Self {
            commands: command_sender,
            snapshots,
            actor,
        }
    }

    /// Shutter press. Returns the new session id, or `None` if a capture is
    /// already in progress or a result is being shown.
    pub async fn capture(&self, image: RgbaImage) -> Result<Option<SessionId>, CaptureError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Capture { image, reply })?;
        response.await.map_err(|_| CaptureError::ServiceStopped)
    }

    /// Keep the result and add it to the word store.
    pub fn accept(&self) -> Result<(), CaptureError> {
        self.send(Command::Accept)
    }

    pub fn retake(&self) -> Result<(), CaptureError> {
        self.send(Command::Retake)
    }

    pub fn discard(&self) -> Result<(), CaptureError> {
        self.send(Command::Discard)
    }

    /// Navigate away, abandoning any in-flight capture.
    pub fn back(&self) -> Result<(), CaptureError> {
        self.send(Command::Back)
    }

    /// Forward a manual translation edit to the word store.
    pub fn edit_translation(&self, id: WordId, translation: &str) -> Result<(), CaptureError> {
        self.send(Command::EditTranslation {
            id,
            translation: translation.to_string(),
        })
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until the session is no longer processing.
    pub async fn settled(&self) -> Result<SessionSnapshot, CaptureError> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|snapshot| !snapshot.is_processing())
            .await
            .map_err(|_| CaptureError::ServiceStopped)?;
        Ok(snapshot.clone())
    }

    /// Stop accepting commands and wait for the actor to finish.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(err) = self.actor.await {
            tracing::warn!("Capture service ended abnormally: {}", err);
        }
    }

    fn send(&self, command: Command) -> Result<(), CaptureError> {
        self.commands
            .send(command)
            .map_err(|_| CaptureError::ServiceStopped)
    }
}

struct Actor {
    session: CaptureSession,
    jobs: mpsc::UnboundedSender<Job>,
    snapshots: watch::Sender<SessionSnapshot>,
    store: Arc<dyn WordStore>,
    translator: Option<Arc<dyn Translator>>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<StageEvent>,
    ) {
        tracing::debug!("Capture service started");
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
            self.snapshots.send_replace(self.session.snapshot());
        }
        tracing::debug!("Capture service stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Capture { image, reply } => {
                let started = self.session.capture(image);
                let id = started.map(|(id, image)| {
                    self.enqueue(Job::Recognize { id, image });
                    id
                });
                // Publish Processing before the caller hears back.
                self.snapshots.send_replace(self.session.snapshot());
                let _ = reply.send(id);
            }
            Command::Accept => {
                if let Some(entry) = self.session.accept() {
                    self.store_entry(entry);
                }
            }
            Command::Retake => {
                self.session.retake();
            }
            Command::Discard => {
                self.session.discard();
            }
            Command::Back => {
                self.session.back();
            }
            Command::EditTranslation { id, translation } => {
                self.store.update(id, &translation);
            }
        }
    }

    fn handle_event(&mut self, event: StageEvent) {
        match event {
            StageEvent::Recognized { id, outcome } => {
                if let Some(image) = self.session.recognition_finished(id, outcome) {
                    self.enqueue(Job::Segment { id, image });
                }
            }
            StageEvent::Segmented { id, composite } => {
                self.session.segmentation_finished(id, composite);
            }
        }
    }

    fn enqueue(&mut self, job: Job) {
        if self.jobs.send(job).is_err() {
            tracing::warn!("Pipeline worker is gone, abandoning capture");
            self.session.back();
        }
    }

    fn store_entry(&self, entry: AcceptedEntry) {
        let Some(id) = self.store.add(&entry.label, &entry.translation) else {
            return;
        };
        tracing::info!("Added '{}' as word {}", entry.label, id);

        if entry.translation != MISSING_TRANSLATION {
            return;
        }
        let Some(translator) = self.translator.clone() else {
            return;
        };
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let label = entry.label;
            let translated =
                tokio::task::spawn_blocking(move || translator.translate(&label)).await;
            match translated {
                Ok(Some(text)) if !text.trim().is_empty() && text != MISSING_TRANSLATION => {
                    store.update(id, text.trim());
                }
                Ok(_) => tracing::debug!("No translation found for word {}", id),
                Err(err) => tracing::warn!("Translation for word {} failed: {}", id, err),
            }
        });
    }
}

async fn run_worker(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    events: mpsc::UnboundedSender<StageEvent>,
    capabilities: Capabilities,
) {
    while let Some(job) = jobs.recv().await {
        let event = match job {
            Job::Recognize { id, image } => StageEvent::Recognized {
                id,
                outcome: recognize(capabilities.recognizer.clone(), image).await,
            },
            Job::Segment { id, image } => StageEvent::Segmented {
                id,
                composite: segment(Arc::clone(&capabilities.processor), image).await,
            },
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

async fn recognize(
    recognizer: Option<Arc<dyn Recognizer>>,
    image: Arc<RgbaImage>,
) -> Result<Vec<Label>> {
    let Some(recognizer) = recognizer else {
        return Err(CaptureError::RecognizerUnavailable("not configured".to_string()).into());
    };
    match tokio::task::spawn_blocking(move || recognizer.recognize(&image)).await {
        Ok(outcome) => outcome,
        Err(err) => Err(CaptureError::StageFailed {
            stage: "recognition",
            reason: err.to_string(),
        }
        .into()),
    }
}

async fn segment(processor: Arc<SubjectProcessor>, image: Arc<RgbaImage>) -> Option<RgbaImage> {
    match tokio::task::spawn_blocking(move || processor.process(&image)).await {
        Ok(composite) => composite,
        Err(err) => {
            let err = CaptureError::StageFailed {
                stage: "segmentation",
                reason: err.to_string(),
            };
            tracing::warn!("{}, showing original", err);
            None
        }
    }
}
