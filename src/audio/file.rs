use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::artifact::Artifact;
use super::capture::{capture_channel, CaptureHandle, CaptureSource, FrameAssembler, FRAME_PERIOD_MS};
use crate::error::CaptureError;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = match spec.sample_format {
            SampleFormat::Int if spec.bits_per_sample <= 16 => reader
                .into_samples::<i16>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            SampleFormat::Int => {
                let shift = spec.bits_per_sample.saturating_sub(16);
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| (v >> shift) as i16))
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to read audio samples")?
            }
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
        };

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

struct Replay {
    capture_id: Uuid,
    paused: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Replays a WAV file as if it were captured live, one frame per second
pub struct WavFileSource {
    path: PathBuf,
    active: Option<Replay>,
}

impl WavFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            active: None,
        }
    }

    fn replay_for(&self, handle: &CaptureHandle) -> Option<&Replay> {
        self.active
            .as_ref()
            .filter(|replay| replay.capture_id == handle.id())
    }
}

#[async_trait::async_trait]
impl CaptureSource for WavFileSource {
    async fn start(&mut self) -> Result<CaptureHandle, CaptureError> {
        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .map_err(|e| CaptureError::Unsupported(e.to_string()))?
            .map_err(|e| {
                warn!("Replay input unavailable: {:#}", e);
                CaptureError::NoDevice
            })?;

        let (sink, events) = capture_channel();
        let handle = CaptureHandle::new(events, audio.sample_rate, audio.channels);
        let paused = Arc::new(AtomicBool::new(false));
        let task_paused = Arc::clone(&paused);

        let task = tokio::spawn(async move {
            let mut assembler = FrameAssembler::new(audio.sample_rate, audio.channels);
            let mut frames = assembler.push(&audio.samples);
            frames.extend(assembler.flush());

            let mut ticker = tokio::time::interval(Duration::from_millis(FRAME_PERIOD_MS));
            for frame in frames {
                loop {
                    ticker.tick().await;
                    if !task_paused.load(Ordering::SeqCst) {
                        break;
                    }
                }
                sink.frame(frame);
            }

            info!("Replay input exhausted");
        });

        self.active = Some(Replay {
            capture_id: handle.id(),
            paused,
            task,
        });

        info!("Replaying {} as capture input", self.path.display());

        Ok(handle)
    }

    fn pause(&mut self, handle: &CaptureHandle) {
        if let Some(replay) = self.replay_for(handle) {
            replay.paused.store(true, Ordering::SeqCst);
        }
    }

    fn resume(&mut self, handle: &CaptureHandle) {
        if let Some(replay) = self.replay_for(handle) {
            replay.paused.store(false, Ordering::SeqCst);
        }
    }

    fn stop(&mut self, handle: CaptureHandle) -> Result<Artifact, CaptureError> {
        if let Some(replay) = self.active.take() {
            replay.task.abort();
        }
        handle.finalize()
    }

    fn name(&self) -> &str {
        "WAV replay"
    }
}

impl Drop for WavFileSource {
    fn drop(&mut self) {
        if let Some(replay) = self.active.take() {
            replay.task.abort();
        }
    }
}
