use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::audio::{Artifact, ArtifactInfo};

/// Shown by the host before navigating away from unsaved work
pub const LEAVE_WARNING: &str = "You have unsaved changes. Are you sure you want to leave?";

/// Warning left after the stream failed mid-recording
pub const DEVICE_LOST_MESSAGE: &str = "Recording stopped: the microphone was disconnected.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Recording,
    Paused,
    Stopped,
    Submitting,
    Submitted,
    Failed,
}

impl SessionStatus {
    /// Whether a capture device is open
    pub fn is_capturing(&self) -> bool {
        matches!(self, SessionStatus::Recording | SessionStatus::Paused)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Recording => "recording",
            SessionStatus::Paused => "paused",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Submitting => "submitting",
            SessionStatus::Submitted => "submitted",
            SessionStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Mutable session data, owned by the controller
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub status: SessionStatus,
    pub elapsed_seconds: u32,
    pub warning_message: Option<String>,
    pub time_limit_reached: bool,
    pub artifact: Option<Artifact>,
    /// User-facing message of the last failed action
    pub last_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            elapsed_seconds: 0,
            warning_message: None,
            time_limit_reached: false,
            artifact: None,
            last_error: None,
            started_at: None,
        }
    }
}

/// Point-in-time view of a session for display
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub elapsed_seconds: u32,
    /// Timer text: `m:ss`, or the bare count-down in the final window
    pub display: String,
    pub warning_message: Option<String>,
    pub time_limit_reached: bool,
    pub artifact: Option<ArtifactInfo>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub leave_warning: Option<&'static str>,
}
