use thiserror::Error;

use crate::session::SessionStatus;

/// Failure to acquire or finalize a capture device stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no capture device available")]
    NoDevice,

    #[error("audio capture unsupported: {0}")]
    Unsupported(String),

    #[error("failed to encode recording: {0}")]
    Encoding(String),
}

impl CaptureError {
    /// Message shown to the contributor
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::PermissionDenied => {
                "Microphone access was denied. Please allow microphone permissions and try again."
            }
            CaptureError::NoDevice => "No microphone was found. Please connect one and try again.",
            CaptureError::Unsupported(_) | CaptureError::Encoding(_) => {
                "Unable to access microphone. Please check your audio settings."
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("submission transport error: {0}")]
    Transport(String),
}

impl SubmissionError {
    pub fn user_message(&self) -> &'static str {
        "Failed to submit story. Please try again."
    }
}

/// Corrupt local persistence; recovered by falling back to defaults
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("malformed persisted state under {key}: {reason}")]
    MalformedPersistedState { key: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("cannot {action} while {status}")]
    InvalidTransition {
        action: &'static str,
        status: SessionStatus,
    },

    #[error("no recording to submit")]
    NoArtifact,

    #[error("recording session is closed")]
    Closed,
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Capture(e) => e.user_message().to_string(),
            SessionError::Submission(e) => e.user_message().to_string(),
            other => other.to_string(),
        }
    }
}
