pub mod artifact;
pub mod capture;
pub mod chunk;
pub mod file;
pub mod microphone;

pub use artifact::{Artifact, ArtifactInfo, ARTIFACT_CONTENT_TYPE, ARTIFACT_FILE_NAME};
pub use capture::{
    capture_channel, AudioFrame, CaptureEvent, CaptureHandle, CaptureSink, CaptureSource,
    FrameAssembler, FRAME_PERIOD_MS,
};
pub use chunk::ChunkAccumulator;
pub use file::{AudioFile, WavFileSource};
pub use microphone::MicrophoneSource;

use crate::config::AudioConfig;

/// Builds a fresh capture source for each recording session
pub trait SourceFactory: Send + Sync {
    fn create(&self) -> Box<dyn CaptureSource>;
}

impl<F> SourceFactory for F
where
    F: Fn() -> Box<dyn CaptureSource> + Send + Sync,
{
    fn create(&self) -> Box<dyn CaptureSource> {
        self()
    }
}

/// Picks the microphone or a replay file based on configuration
pub struct CaptureSourceFactory {
    config: AudioConfig,
}

impl CaptureSourceFactory {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }
}

impl SourceFactory for CaptureSourceFactory {
    fn create(&self) -> Box<dyn CaptureSource> {
        match &self.config.input_file {
            Some(path) => Box::new(WavFileSource::new(shellexpand::tilde(path).into_owned())),
            None => Box::new(MicrophoneSource::new(
                self.config.sample_rate,
                self.config.channels,
            )),
        }
    }
}
