use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::time::Duration;
use tracing::{error, info};

use super::Uploader;
use crate::audio::{Artifact, ARTIFACT_FILE_NAME};
use crate::error::SubmissionError;
use crate::wizard::StoryMetadata;

pub const AUDIO_FIELD: &str = "audio";
pub const TRANSCRIPT_REQUESTED_FIELD: &str = "transcriptRequested";

/// Text fields of the multipart request
///
/// Every defined metadata key in its JSON spelling, then the transcript flag.
pub fn form_fields(metadata: &StoryMetadata) -> Vec<(String, String)> {
    let mut fields = Vec::new();

    if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(metadata) {
        for (key, value) in map {
            let text = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            fields.push((key, text));
        }
    }

    fields.push((
        TRANSCRIPT_REQUESTED_FIELD.to_string(),
        metadata.transcript.to_string(),
    ));
    fields
}

pub struct SubmissionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SubmissionClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(artifact: &Artifact, metadata: &StoryMetadata) -> Result<Form, SubmissionError> {
        let body = Body::from(artifact.bytes.clone());
        let audio = Part::stream_with_length(body, artifact.size_bytes() as u64)
            .file_name(ARTIFACT_FILE_NAME)
            .mime_str(artifact.content_type)
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let form = form_fields(metadata)
            .into_iter()
            .fold(Form::new().part(AUDIO_FIELD, audio), |form, (key, value)| {
                form.text(key, value)
            });

        Ok(form)
    }
}

#[async_trait::async_trait]
impl Uploader for SubmissionClient {
    async fn submit(&self, artifact: &Artifact, metadata: &StoryMetadata) -> Result<(), SubmissionError> {
        info!(
            "Submitting story {} ({} bytes) to {}",
            artifact.id,
            artifact.size_bytes(),
            self.endpoint
        );

        let form = Self::build_form(artifact, metadata)?;

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Story submission failed: {}", e);
                SubmissionError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Ingestion endpoint rejected story: {}", status);
            return Err(SubmissionError::Transport(format!(
                "ingestion endpoint returned {}",
                status
            )));
        }

        info!("Story {} submitted", artifact.id);
        Ok(())
    }
}
