// Shared fakes for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use story_recorder::audio::{capture_channel, Artifact, AudioFrame, CaptureHandle, CaptureSink, CaptureSource};
use story_recorder::error::{CaptureError, SubmissionError};
use story_recorder::submission::Uploader;
use story_recorder::wizard::{StoryMetadata, WizardStore};
use story_recorder::RecordingSessionController;
use uuid::Uuid;

pub const SAMPLE_RATE: u32 = 16000;
pub const SAMPLES_PER_FRAME: usize = 16000; // one second of mono audio

pub fn frame(timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![100i16; SAMPLES_PER_FRAME],
        sample_rate: SAMPLE_RATE,
        channels: 1,
        timestamp_ms,
    }
}

/// What a fake source observed
#[derive(Default)]
pub struct Probe {
    pub starts: usize,
    pub stops: usize,
    pub pauses: usize,
    pub resumes: usize,
    pub open: bool,
    pub sink: Option<CaptureSink>,
}

impl Probe {
    pub fn emit_frame(&self, timestamp_ms: u64) {
        if let Some(sink) = &self.sink {
            sink.frame(frame(timestamp_ms));
        }
    }

    pub fn lose_device(&self, reason: &str) {
        if let Some(sink) = &self.sink {
            sink.device_lost(reason);
        }
    }
}

/// In-process capture source emitting one frame on start
pub struct FakeSource {
    probe: Arc<Mutex<Probe>>,
    fail_with: Option<CaptureError>,
}

impl FakeSource {
    pub fn new() -> (Self, Arc<Mutex<Probe>>) {
        let probe = Arc::new(Mutex::new(Probe::default()));
        (
            Self {
                probe: Arc::clone(&probe),
                fail_with: None,
            },
            probe,
        )
    }

    pub fn failing(error: CaptureError) -> (Self, Arc<Mutex<Probe>>) {
        let (mut source, probe) = Self::new();
        source.fail_with = Some(error);
        (source, probe)
    }
}

#[async_trait::async_trait]
impl CaptureSource for FakeSource {
    async fn start(&mut self) -> Result<CaptureHandle, CaptureError> {
        if let Some(error) = self.fail_with.clone() {
            return Err(error);
        }

        let mut probe = self.probe.lock().unwrap();
        assert!(!probe.open, "a second capture was opened while one was active");

        let (sink, events) = capture_channel();
        sink.frame(frame(0));
        probe.starts += 1;
        probe.open = true;
        probe.sink = Some(sink);

        Ok(CaptureHandle::new(events, SAMPLE_RATE, 1))
    }

    fn pause(&mut self, _handle: &CaptureHandle) {
        self.probe.lock().unwrap().pauses += 1;
    }

    fn resume(&mut self, _handle: &CaptureHandle) {
        self.probe.lock().unwrap().resumes += 1;
    }

    fn stop(&mut self, handle: CaptureHandle) -> Result<Artifact, CaptureError> {
        {
            let mut probe = self.probe.lock().unwrap();
            probe.stops += 1;
            probe.open = false;
            probe.sink = None;
        }
        handle.finalize()
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Uploader failing a configurable number of times before succeeding
#[derive(Default)]
pub struct FakeUploader {
    failures_remaining: AtomicUsize,
    pub calls: Mutex<Vec<(Uuid, StoryMetadata)>>,
}

impl FakeUploader {
    pub fn failing_times(failures: usize) -> Self {
        Self {
            failures_remaining: AtomicUsize::new(failures),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Uploader for FakeUploader {
    async fn submit(&self, artifact: &Artifact, metadata: &StoryMetadata) -> Result<(), SubmissionError> {
        self.calls.lock().unwrap().push((artifact.id, metadata.clone()));

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SubmissionError::Transport("ingestion endpoint returned 503".to_string()));
        }
        Ok(())
    }
}

pub fn metadata() -> StoryMetadata {
    StoryMetadata {
        name: Some("Ada".to_string()),
        story_title: Some("The chipped mug".to_string()),
        anonymous: false,
        transcript: true,
        email: Some("ada@example.com".to_string()),
        birthdate: "1990-04-12".to_string(),
    }
}

pub struct Fixture {
    pub controller: RecordingSessionController,
    pub probe: Arc<Mutex<Probe>>,
    pub uploader: Arc<FakeUploader>,
    pub store: WizardStore,
}

pub fn fixture_with(source: FakeSource, probe: Arc<Mutex<Probe>>, uploader: FakeUploader) -> Fixture {
    let uploader = Arc::new(uploader);
    let store = WizardStore::in_memory();
    let controller = RecordingSessionController::new(
        metadata(),
        Box::new(source),
        uploader.clone(),
        store.clone(),
    );

    Fixture {
        controller,
        probe,
        uploader,
        store,
    }
}

pub fn fixture() -> Fixture {
    let (source, probe) = FakeSource::new();
    fixture_with(source, probe, FakeUploader::default())
}
