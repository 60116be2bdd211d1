use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use super::artifact::Artifact;
use super::chunk::ChunkAccumulator;
use crate::error::CaptureError;

/// Cadence at which sources emit frames
pub const FRAME_PERIOD_MS: u64 = 1000;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Events flowing from a capture source to the controller
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Frame(AudioFrame),
    /// The stream failed after a successful start
    DeviceLost(String),
}

/// Sending half of a capture cycle's event channel
#[derive(Debug, Clone)]
pub struct CaptureSink {
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl CaptureSink {
    pub fn frame(&self, frame: AudioFrame) {
        if self.tx.send(CaptureEvent::Frame(frame)).is_err() {
            warn!("Capture handle dropped, discarding frame");
        }
    }

    pub fn device_lost(&self, reason: impl Into<String>) {
        let _ = self.tx.send(CaptureEvent::DeviceLost(reason.into()));
    }
}

/// Create the event channel for one capture cycle
pub fn capture_channel() -> (CaptureSink, mpsc::UnboundedReceiver<CaptureEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CaptureSink { tx }, rx)
}

/// One started capture cycle
///
/// Returned by [`CaptureSource::start`] and consumed by [`CaptureSource::stop`],
/// so a handle can only ever be stopped once.
pub struct CaptureHandle {
    id: Uuid,
    events: mpsc::UnboundedReceiver<CaptureEvent>,
    accumulator: ChunkAccumulator,
    device_error: Option<String>,
}

impl CaptureHandle {
    pub fn new(
        events: mpsc::UnboundedReceiver<CaptureEvent>,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            events,
            accumulator: ChunkAccumulator::new(sample_rate, channels),
            device_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Move pending frames into the accumulator
    ///
    /// Returns the device error the first time one is observed.
    pub fn drain(&mut self) -> Option<String> {
        let mut newly_lost = None;

        while let Ok(event) = self.events.try_recv() {
            match event {
                CaptureEvent::Frame(frame) => self.accumulator.push(frame),
                CaptureEvent::DeviceLost(reason) => {
                    if self.device_error.is_none() {
                        self.device_error = Some(reason.clone());
                        newly_lost = Some(reason);
                    }
                }
            }
        }

        newly_lost
    }

    pub fn frame_count(&self) -> usize {
        self.accumulator.frame_count()
    }

    /// Drain what is left and combine everything into one artifact
    pub fn finalize(mut self) -> Result<Artifact, CaptureError> {
        self.drain();
        self.accumulator.finalize()
    }
}

/// Packs raw interleaved samples into fixed-period frames
pub struct FrameAssembler {
    sample_rate: u32,
    channels: u16,
    samples_per_frame: usize,
    pending: Vec<i16>,
    emitted_samples: u64,
}

impl FrameAssembler {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        let samples_per_frame =
            (sample_rate as u64 * channels as u64 * FRAME_PERIOD_MS / 1000).max(1) as usize;
        Self {
            sample_rate,
            channels,
            samples_per_frame,
            pending: Vec::with_capacity(samples_per_frame),
            emitted_samples: 0,
        }
    }

    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    /// Append samples, returning every frame that became complete
    pub fn push(&mut self, samples: &[i16]) -> Vec<AudioFrame> {
        let mut complete = Vec::new();
        for &sample in samples {
            self.pending.push(sample);
            if self.pending.len() == self.samples_per_frame {
                complete.push(self.take_frame());
            }
        }
        complete
    }

    /// Emit the partial frame, if any
    pub fn flush(&mut self) -> Option<AudioFrame> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take_frame())
        }
    }

    fn take_frame(&mut self) -> AudioFrame {
        let samples = std::mem::replace(&mut self.pending, Vec::with_capacity(self.samples_per_frame));
        let per_second = self.sample_rate as u64 * self.channels as u64;
        let timestamp_ms = if per_second == 0 {
            0
        } else {
            self.emitted_samples * 1000 / per_second
        };
        self.emitted_samples += samples.len() as u64;

        AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms,
        }
    }
}

/// Platform audio capture
///
/// Implementations:
/// - Microphone: cpal default input device
/// - File: replay a WAV file (headless runs and demos)
#[async_trait::async_trait]
pub trait CaptureSource: Send {
    /// Acquire the device and begin emitting frames
    ///
    /// May suspend while the platform asks the user for permission.
    async fn start(&mut self) -> Result<CaptureHandle, CaptureError>;

    /// Suspend emission without releasing the device
    fn pause(&mut self, handle: &CaptureHandle);

    /// Reverse a pause
    fn resume(&mut self, handle: &CaptureHandle);

    /// Release the device and finalize the cycle into one artifact
    ///
    /// The device is released even when finalizing fails.
    fn stop(&mut self, handle: CaptureHandle) -> Result<Artifact, CaptureError>;

    /// Source name for logging
    fn name(&self) -> &str;
}
