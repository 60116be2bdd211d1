use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::state::{
    RecordingSession, SessionSnapshot, SessionStatus, DEVICE_LOST_MESSAGE, LEAVE_WARNING,
};
use crate::audio::{Artifact, CaptureHandle, CaptureSource};
use crate::error::{CaptureError, SessionError, SubmissionError};
use crate::submission::Uploader;
use crate::timebox::{self, TIME_UP_MESSAGE};
use crate::wizard::{StoryMetadata, WizardStore};

/// Artifact and details handed to the uploader by [`RecordingSessionController::begin_submit`]
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub artifact: Artifact,
    pub metadata: StoryMetadata,
}

/// State machine for one recording step activation
///
/// ```text
/// Idle -> Recording <-> Paused -> Stopped -> Submitting -> Submitted
///                                    ^  |          |
///                          re_record |  |          v
///                 Idle <-------------+  +------ Failed (retry -> Submitting)
/// ```
///
/// Owns the capture source exclusively; at most one capture handle is open.
pub struct RecordingSessionController {
    id: Uuid,
    metadata: StoryMetadata,
    source: Box<dyn CaptureSource>,
    uploader: Arc<dyn Uploader>,
    store: WizardStore,
    session: RecordingSession,
    capture: Option<CaptureHandle>,
}

impl RecordingSessionController {
    pub fn new(
        metadata: StoryMetadata,
        source: Box<dyn CaptureSource>,
        uploader: Arc<dyn Uploader>,
        store: WizardStore,
    ) -> Self {
        let id = Uuid::new_v4();
        info!("Creating recording session {} ({})", id, source.name());

        Self {
            id,
            metadata,
            source,
            uploader,
            store,
            session: RecordingSession::default(),
            capture: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.session.elapsed_seconds
    }

    pub fn warning_message(&self) -> Option<&str> {
        self.session.warning_message.as_deref()
    }

    pub fn time_limit_reached(&self) -> bool {
        self.session.time_limit_reached
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.session.artifact.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.session.last_error.as_deref()
    }

    pub fn metadata(&self) -> &StoryMetadata {
        &self.metadata
    }

    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub fn uploader(&self) -> Arc<dyn Uploader> {
        Arc::clone(&self.uploader)
    }

    /// Whether the session clock should be advancing
    pub fn is_ticking(&self) -> bool {
        self.session.status == SessionStatus::Recording
    }

    fn guard(&self, action: &'static str, allowed: &[SessionStatus]) -> Result<(), SessionError> {
        if allowed.contains(&self.session.status) {
            Ok(())
        } else {
            warn!("Rejected {} while {}", action, self.session.status);
            Err(SessionError::InvalidTransition {
                action,
                status: self.session.status,
            })
        }
    }

    fn reset_cycle(&mut self) {
        self.session.elapsed_seconds = 0;
        self.session.warning_message = None;
        self.session.time_limit_reached = false;
        self.session.started_at = None;
    }

    /// Acquire the device and begin a capture cycle
    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.guard("start", &[SessionStatus::Idle])?;

        info!("Starting recording session {}", self.id);

        match self.source.start().await {
            Ok(handle) => {
                self.reset_cycle();
                self.session.last_error = None;
                self.session.started_at = Some(Utc::now());
                self.session.status = SessionStatus::Recording;
                self.capture = Some(handle);
                info!("Recording session {} started", self.id);
                Ok(())
            }
            Err(e) => {
                warn!("Capture device unavailable: {}", e);
                self.session.last_error = Some(e.user_message().to_string());
                Err(e.into())
            }
        }
    }

    /// Advance the clock by one second
    pub fn tick(&mut self) -> bool {
        self.advance(1)
    }

    /// Advance the clock by `seconds`, catching up missed ticks
    ///
    /// Elapsed time is clamped at the limit and the cutoff fires within the
    /// same call. Returns whether the clock moved.
    pub fn advance(&mut self, seconds: u32) -> bool {
        if !self.is_ticking() || seconds == 0 {
            return false;
        }

        if self.stop_if_device_lost() {
            return false;
        }

        let next = self
            .session
            .elapsed_seconds
            .saturating_add(seconds)
            .min(timebox::LIMIT);
        self.session.elapsed_seconds = next;
        self.session.warning_message = timebox::message(next);

        debug!("Session {} at {}", self.id, timebox::display(next));

        if timebox::must_stop(next) {
            info!("Session {} reached the time limit", self.id);
            if self.stop_capture().is_ok() {
                self.session.time_limit_reached = true;
                self.session.warning_message = Some(TIME_UP_MESSAGE.to_string());
            }
        }

        true
    }

    /// Stop with the partial artifact if the stream failed since the last drain
    fn stop_if_device_lost(&mut self) -> bool {
        let Some(reason) = self.capture.as_mut().and_then(CaptureHandle::drain) else {
            return false;
        };

        warn!("Capture device lost during session {}: {}", self.id, reason);
        if self.stop_capture().is_ok() {
            self.session.warning_message = Some(DEVICE_LOST_MESSAGE.to_string());
        }
        true
    }

    /// Pause the clock and the stream
    ///
    /// A device loss pending at this point stops the session instead.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.guard("pause", &[SessionStatus::Recording])?;
        if self.session.time_limit_reached {
            return Err(SessionError::InvalidTransition {
                action: "pause",
                status: self.session.status,
            });
        }

        if self.stop_if_device_lost() {
            return Ok(());
        }
        if let Some(handle) = self.capture.as_ref() {
            self.source.pause(handle);
        }
        self.session.status = SessionStatus::Paused;
        info!("Session {} paused at {}s", self.id, self.session.elapsed_seconds);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.guard("resume", &[SessionStatus::Paused])?;
        if self.session.time_limit_reached {
            return Err(SessionError::InvalidTransition {
                action: "resume",
                status: self.session.status,
            });
        }

        if let Some(handle) = self.capture.as_ref() {
            self.source.resume(handle);
        }
        self.session.status = SessionStatus::Recording;
        info!("Session {} resumed at {}s", self.id, self.session.elapsed_seconds);
        Ok(())
    }

    /// Stop capturing and hold the artifact for review
    pub fn stop(&mut self) -> Result<(), SessionError> {
        self.guard("stop", &[SessionStatus::Recording, SessionStatus::Paused])?;
        self.stop_capture()
    }

    fn stop_capture(&mut self) -> Result<(), SessionError> {
        let Some(handle) = self.capture.take() else {
            return Err(self.abandon_cycle(CaptureError::Encoding("no open capture".to_string())));
        };

        match self.source.stop(handle) {
            Ok(artifact) => {
                info!(
                    "Session {} stopped at {}s ({:.1}s captured)",
                    self.id,
                    self.session.elapsed_seconds,
                    artifact.duration_secs()
                );
                self.session.artifact = Some(artifact);
                self.session.status = SessionStatus::Stopped;
                Ok(())
            }
            Err(e) => Err(self.abandon_cycle(e)),
        }
    }

    /// Return to Idle after a cycle could not be finalized
    fn abandon_cycle(&mut self, e: CaptureError) -> SessionError {
        error!("Discarding capture cycle of session {}: {}", self.id, e);
        self.reset_cycle();
        self.session.artifact = None;
        self.session.status = SessionStatus::Idle;
        self.session.last_error = Some(e.user_message().to_string());
        e.into()
    }

    /// Discard the artifact and return to Idle
    pub fn re_record(&mut self) -> Result<(), SessionError> {
        self.guard("re-record", &[SessionStatus::Stopped, SessionStatus::Failed])?;

        if let Some(artifact) = self.session.artifact.take() {
            info!("Discarding artifact {}", artifact.id);
        }
        self.reset_cycle();
        self.session.last_error = None;
        self.session.status = SessionStatus::Idle;
        Ok(())
    }

    /// Move to Submitting and take what the uploader needs
    pub fn begin_submit(&mut self) -> Result<PendingUpload, SessionError> {
        self.guard("submit", &[SessionStatus::Stopped, SessionStatus::Failed])?;

        let artifact = self.session.artifact.clone().ok_or(SessionError::NoArtifact)?;
        self.session.status = SessionStatus::Submitting;
        self.session.last_error = None;

        Ok(PendingUpload {
            artifact,
            metadata: self.metadata.clone(),
        })
    }

    /// Apply the uploader's outcome
    pub fn finish_submit(&mut self, result: Result<(), SubmissionError>) -> Result<(), SessionError> {
        self.guard("finish submit", &[SessionStatus::Submitting])?;

        match result {
            Ok(()) => {
                self.session.status = SessionStatus::Submitted;
                self.session.warning_message = None;
                self.store.clear();
                info!("Session {} submitted", self.id);
                Ok(())
            }
            Err(e) => {
                error!("Session {} submission failed: {}", self.id, e);
                self.session.status = SessionStatus::Failed;
                self.session.last_error = Some(e.user_message().to_string());
                Err(e.into())
            }
        }
    }

    /// Submit the artifact and wait for the outcome
    pub async fn submit(&mut self) -> Result<(), SessionError> {
        let upload = self.begin_submit()?;
        let result = self.uploader.submit(&upload.artifact, &upload.metadata).await;
        self.finish_submit(result)
    }

    /// Whether leaving now would lose a recording
    pub fn leave_warning(&self) -> Option<&'static str> {
        let unsaved = match self.session.status {
            SessionStatus::Recording | SessionStatus::Paused | SessionStatus::Submitting => true,
            SessionStatus::Submitted => false,
            _ => self.session.artifact.is_some(),
        };
        unsaved.then_some(LEAVE_WARNING)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            status: self.session.status,
            elapsed_seconds: self.session.elapsed_seconds,
            display: timebox::display(self.session.elapsed_seconds).to_string(),
            warning_message: self.session.warning_message.clone(),
            time_limit_reached: self.session.time_limit_reached,
            artifact: self.session.artifact.as_ref().map(Artifact::info),
            error: self.session.last_error.clone(),
            started_at: self.session.started_at,
            leave_warning: self.leave_warning(),
        }
    }

    /// Release the device if a cycle is still open; the partial cycle is discarded
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.capture.take() {
            info!("Tearing down session {} with an open capture", self.id);
            if let Err(e) = self.source.stop(handle) {
                debug!("Discarded partial cycle failed to finalize: {}", e);
            }
            self.reset_cycle();
            self.session.status = SessionStatus::Idle;
        }
    }
}

impl Drop for RecordingSessionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
