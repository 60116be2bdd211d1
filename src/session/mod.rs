//! Recording session management
//!
//! This module provides the controller that owns one capture cycle at a time:
//! - Start/pause/resume/stop of the capture source
//! - The time-boxed session clock with staged warnings and a hard cutoff
//! - Review, re-record and submission of the finalized artifact
//! - A tokio actor that drives the clock and serializes all transitions

mod controller;
mod driver;
mod state;

pub use controller::{PendingUpload, RecordingSessionController};
pub use driver::SessionHandle;
pub use state::{
    RecordingSession, SessionSnapshot, SessionStatus, DEVICE_LOST_MESSAGE, LEAVE_WARNING,
};
