// Microphone capture using cpal
//
// cpal streams are not Send, so each capture cycle gets a dedicated worker
// thread that owns the stream for its whole lifetime. The async side talks to
// it over a command channel and receives frames over the capture event channel.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, DefaultStreamConfigError, PlayStreamError, SampleFormat};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::artifact::Artifact;
use super::capture::{capture_channel, CaptureHandle, CaptureSink, CaptureSource, FrameAssembler};
use crate::error::CaptureError;

#[derive(Debug, Clone, Copy)]
struct StreamFormat {
    sample_rate: u32,
    channels: u16,
}

enum WorkerCommand {
    Pause,
    Resume,
    Stop,
}

struct Worker {
    capture_id: Uuid,
    commands: std_mpsc::Sender<WorkerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn send(&self, command: WorkerCommand) {
        if self.commands.send(command).is_err() {
            warn!("Microphone worker already exited");
        }
    }

    /// Stop the stream and wait until the device is released
    fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.commands.send(WorkerCommand::Stop);
            if thread.join().is_err() {
                error!("Microphone worker panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Default input device capture
pub struct MicrophoneSource {
    preferred: StreamFormat,
    worker: Option<Worker>,
}

impl MicrophoneSource {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            preferred: StreamFormat {
                sample_rate,
                channels,
            },
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for MicrophoneSource {
    async fn start(&mut self) -> Result<CaptureHandle, CaptureError> {
        if let Some(mut stale) = self.worker.take() {
            warn!("Releasing microphone left open by a previous cycle");
            stale.shutdown();
        }

        info!("Requesting microphone");

        let (sink, events) = capture_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (command_tx, command_rx) = std_mpsc::channel();
        let preferred = self.preferred;

        let thread = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || run_worker(preferred, sink, command_rx, ready_tx))
            .map_err(|e| CaptureError::Unsupported(format!("failed to spawn capture worker: {}", e)))?;

        let format = match ready_rx.await {
            Ok(Ok(format)) => format,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(CaptureError::Unsupported(
                    "capture worker exited before opening the device".to_string(),
                ));
            }
        };

        let handle = CaptureHandle::new(events, format.sample_rate, format.channels);
        self.worker = Some(Worker {
            capture_id: handle.id(),
            commands: command_tx,
            thread: Some(thread),
        });

        info!(
            "Microphone capture started ({}Hz, {} channels)",
            format.sample_rate, format.channels
        );

        Ok(handle)
    }

    fn pause(&mut self, handle: &CaptureHandle) {
        match &self.worker {
            Some(worker) if worker.capture_id == handle.id() => worker.send(WorkerCommand::Pause),
            _ => warn!("Pause ignored: handle {} is not active", handle.id()),
        }
    }

    fn resume(&mut self, handle: &CaptureHandle) {
        match &self.worker {
            Some(worker) if worker.capture_id == handle.id() => worker.send(WorkerCommand::Resume),
            _ => warn!("Resume ignored: handle {} is not active", handle.id()),
        }
    }

    fn stop(&mut self, handle: CaptureHandle) -> Result<Artifact, CaptureError> {
        match self.worker.take() {
            Some(mut worker) => {
                if worker.capture_id != handle.id() {
                    warn!("Stopping worker for a different handle than {}", handle.id());
                }
                worker.shutdown();
                info!("Microphone released");
            }
            None => warn!("Stop called with no open microphone"),
        }

        handle.finalize()
    }

    fn name(&self) -> &str {
        "Microphone (cpal)"
    }
}

fn run_worker(
    preferred: StreamFormat,
    sink: CaptureSink,
    commands: std_mpsc::Receiver<WorkerCommand>,
    ready: oneshot::Sender<Result<StreamFormat, CaptureError>>,
) {
    let paused = Arc::new(AtomicBool::new(false));

    let (stream, format, assembler) = match open_stream(preferred, sink.clone(), Arc::clone(&paused)) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(classify_play(e)));
        return;
    }

    if ready.send(Ok(format)).is_err() {
        // start() was abandoned; dropping the stream releases the device
        return;
    }

    while let Ok(command) = commands.recv() {
        match command {
            WorkerCommand::Pause => {
                paused.store(true, Ordering::SeqCst);
                if let Err(e) = stream.pause() {
                    debug!("Device pause unsupported, gating callback only: {}", e);
                }
            }
            WorkerCommand::Resume => {
                if let Err(e) = stream.play() {
                    error!("Failed to resume microphone stream: {}", e);
                    sink.device_lost(e.to_string());
                }
                paused.store(false, Ordering::SeqCst);
            }
            WorkerCommand::Stop => break,
        }
    }

    drop(stream);

    if let Ok(mut assembler) = assembler.lock() {
        if let Some(frame) = assembler.flush() {
            sink.frame(frame);
        }
    };
}

type OpenedStream = (cpal::Stream, StreamFormat, Arc<Mutex<FrameAssembler>>);

fn open_stream(
    preferred: StreamFormat,
    sink: CaptureSink,
    paused: Arc<AtomicBool>,
) -> Result<OpenedStream, CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

    info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let supported = choose_config(&device, preferred)?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let format = StreamFormat {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };
    let assembler = Arc::new(Mutex::new(FrameAssembler::new(format.sample_rate, format.channels)));

    let stream = match sample_format {
        SampleFormat::I16 => build_stream::<i16>(&device, &config, sink, paused, Arc::clone(&assembler)),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, sink, paused, Arc::clone(&assembler)),
        SampleFormat::F32 => build_stream::<f32>(&device, &config, sink, paused, Arc::clone(&assembler)),
        other => Err(CaptureError::Unsupported(format!("sample format {:?}", other))),
    }?;

    Ok((stream, format, assembler))
}

/// Prefer the configured rate and channel count, else the device default
fn choose_config(
    device: &cpal::Device,
    preferred: StreamFormat,
) -> Result<cpal::SupportedStreamConfig, CaptureError> {
    if let Ok(mut ranges) = device.supported_input_configs() {
        let matching = ranges.find(|range| {
            range.channels() == preferred.channels
                && range.min_sample_rate().0 <= preferred.sample_rate
                && preferred.sample_rate <= range.max_sample_rate().0
        });
        if let Some(range) = matching {
            return Ok(range.with_sample_rate(cpal::SampleRate(preferred.sample_rate)));
        }
    }

    device.default_input_config().map_err(classify_default_config)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sink: CaptureSink,
    paused: Arc<AtomicBool>,
    assembler: Arc<Mutex<FrameAssembler>>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let data_sink = sink.clone();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if paused.load(Ordering::SeqCst) {
                    return;
                }

                let samples: Vec<i16> = data
                    .iter()
                    .map(|&sample| {
                        let value: f32 = cpal::Sample::from_sample(sample);
                        (value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
                    })
                    .collect();

                if let Ok(mut assembler) = assembler.lock() {
                    for frame in assembler.push(&samples) {
                        data_sink.frame(frame);
                    }
                }
            },
            move |err| {
                error!("Microphone stream error: {}", err);
                sink.device_lost(err.to_string());
            },
            None,
        )
        .map_err(classify_build)
}

/// Map a backend message onto the capture error kinds
pub fn classify_backend_message(description: &str) -> CaptureError {
    let lower = description.to_lowercase();
    let denied = ["permission", "denied", "not allowed", "unauthorized"]
        .iter()
        .any(|needle| lower.contains(needle));

    if denied {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Unsupported(description.to_string())
    }
}

fn classify_default_config(err: DefaultStreamConfigError) -> CaptureError {
    match err {
        DefaultStreamConfigError::DeviceNotAvailable => CaptureError::NoDevice,
        DefaultStreamConfigError::BackendSpecific { err } => classify_backend_message(&err.description),
        #[allow(unreachable_patterns)]
        other => CaptureError::Unsupported(other.to_string()),
    }
}

fn classify_build(err: BuildStreamError) -> CaptureError {
    match err {
        BuildStreamError::DeviceNotAvailable => CaptureError::NoDevice,
        BuildStreamError::BackendSpecific { err } => classify_backend_message(&err.description),
        other => CaptureError::Unsupported(other.to_string()),
    }
}

fn classify_play(err: PlayStreamError) -> CaptureError {
    match err {
        PlayStreamError::DeviceNotAvailable => CaptureError::NoDevice,
        PlayStreamError::BackendSpecific { err } => classify_backend_message(&err.description),
        #[allow(unreachable_patterns)]
        other => CaptureError::Unsupported(other.to_string()),
    }
}
