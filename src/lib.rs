pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod submission;
pub mod timebox;
pub mod wizard;

pub use audio::{
    Artifact, AudioFrame, CaptureHandle, CaptureSource, CaptureSourceFactory, MicrophoneSource,
    SourceFactory, WavFileSource,
};
pub use config::Config;
pub use error::{CaptureError, SessionError, StoreError, SubmissionError};
pub use http::{create_router, AppState};
pub use session::{RecordingSessionController, SessionHandle, SessionSnapshot, SessionStatus};
pub use submission::{SubmissionClient, Uploader};
pub use wizard::{StoryMetadata, WizardState, WizardStep, WizardStore};
