//! Story submission to the ingestion endpoint

mod client;

pub use client::{form_fields, SubmissionClient, AUDIO_FIELD, TRANSCRIPT_REQUESTED_FIELD};

use crate::audio::Artifact;
use crate::error::SubmissionError;
use crate::wizard::StoryMetadata;

/// Delivers a finished recording and its details in one request
///
/// Implementations never retry; resubmission is a user action.
#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    async fn submit(&self, artifact: &Artifact, metadata: &StoryMetadata) -> Result<(), SubmissionError>;
}
