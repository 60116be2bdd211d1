use bytes::Bytes;
use chrono::Utc;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::artifact::{Artifact, ARTIFACT_CONTENT_TYPE};
use super::capture::AudioFrame;
use crate::error::CaptureError;

/// Buffers the frames of one capture cycle until finalize
pub struct ChunkAccumulator {
    sample_rate: u32,
    channels: u16,
    frames: Vec<AudioFrame>,
    sample_count: usize,
}

impl ChunkAccumulator {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            frames: Vec::new(),
            sample_count: 0,
        }
    }

    pub fn push(&mut self, frame: AudioFrame) {
        if frame.sample_rate != self.sample_rate || frame.channels != self.channels {
            warn!(
                "Dropping frame at {}ms: format {}Hz/{}ch does not match {}Hz/{}ch",
                frame.timestamp_ms, frame.sample_rate, frame.channels, self.sample_rate, self.channels
            );
            return;
        }

        debug!(
            "Buffered frame at {}ms ({} samples)",
            frame.timestamp_ms,
            frame.samples.len()
        );
        self.sample_count += frame.samples.len();
        self.frames.push(frame);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Combine every buffered frame into one WAV artifact
    pub fn finalize(self) -> Result<Artifact, CaptureError> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(self.sample_count * 2 + 44));
        {
            let mut writer = WavWriter::new(&mut cursor, spec)
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;

            for frame in &self.frames {
                for &sample in &frame.samples {
                    writer
                        .write_sample(sample)
                        .map_err(|e| CaptureError::Encoding(e.to_string()))?;
                }
            }

            writer
                .finalize()
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        }

        let artifact = Artifact {
            id: Uuid::new_v4(),
            content_type: ARTIFACT_CONTENT_TYPE,
            bytes: Bytes::from(cursor.into_inner()),
            sample_rate: self.sample_rate,
            channels: self.channels,
            sample_count: self.sample_count,
            recorded_at: Utc::now(),
        };

        info!(
            "Finalized artifact {}: {} frames, {:.1}s, {} bytes",
            artifact.id,
            self.frames.len(),
            artifact.duration_secs(),
            artifact.size_bytes()
        );

        Ok(artifact)
    }
}
