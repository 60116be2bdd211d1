use chrono::{DateTime, Utc};
use serde::Serialize;
use bytes::Bytes;
use uuid::Uuid;

pub const ARTIFACT_CONTENT_TYPE: &str = "audio/wav";
pub const ARTIFACT_FILE_NAME: &str = "story.wav";

/// The single combined recording produced when a capture cycle is finalized
///
/// Cloning shares the encoded bytes.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub id: Uuid,
    pub content_type: &'static str,
    pub bytes: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
    /// Number of interleaved samples encoded
    pub sample_count: usize,
    pub recorded_at: DateTime<Utc>,
}

impl Artifact {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn info(&self) -> ArtifactInfo {
        ArtifactInfo {
            id: self.id,
            content_type: self.content_type,
            size_bytes: self.size_bytes(),
            duration_secs: self.duration_secs(),
            recorded_at: self.recorded_at,
        }
    }
}

/// Serializable summary of an artifact for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub id: Uuid,
    pub content_type: &'static str,
    pub size_bytes: usize,
    pub duration_secs: f64,
    pub recorded_at: DateTime<Utc>,
}
