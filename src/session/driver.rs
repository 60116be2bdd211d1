use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::controller::RecordingSessionController;
use super::state::SessionSnapshot;
use crate::audio::Artifact;
use crate::error::{SessionError, SubmissionError};

const TICK_PERIOD: Duration = Duration::from_secs(1);

type Reply = oneshot::Sender<Result<SessionSnapshot, SessionError>>;

enum Command {
    Start(Reply),
    Pause(Reply),
    Resume(Reply),
    Stop(Reply),
    ReRecord(Reply),
    Submit(Reply),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Artifact(oneshot::Sender<Option<Artifact>>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a controller running on its own task
///
/// All transitions are serialized through one command channel; the clock
/// ticks on the same task, so a tick never overlaps a user action.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn spawn(controller: RecordingSessionController) -> Self {
        let id = controller.id();
        let (command_tx, command_rx) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

        tokio::spawn(run(controller, command_rx, snapshot_tx));

        Self {
            id,
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    async fn request(&self, command: impl FnOnce(Reply) -> Command) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn start(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Start).await
    }

    pub async fn pause(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Resume).await
    }

    pub async fn stop(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Stop).await
    }

    pub async fn re_record(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::ReRecord).await
    }

    /// Resolves once the upload finished
    pub async fn submit(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Submit).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn artifact(&self) -> Result<Option<Artifact>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Artifact(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    /// Most recently published snapshot, without a round-trip
    pub fn latest(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receives a snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Release the device and end the task
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// A fresh clock; recreated on start and resume so paused time never accrues
fn new_ticker() -> Interval {
    let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    // Missed ticks are replayed one by one so the cutoff is never skipped
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    ticker
}

async fn run(
    mut controller: RecordingSessionController,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
) {
    let (upload_tx, mut upload_rx) = mpsc::channel::<Result<(), SubmissionError>>(1);
    let mut ticker = new_ticker();
    let mut pending_submit: Option<Reply> = None;

    debug!("Session task {} started", controller.id());

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };

                match command {
                    Command::Start(reply) => {
                        let result = controller.start().await.map(|_| controller.snapshot());
                        ticker = new_ticker();
                        let _ = reply.send(result);
                    }
                    Command::Pause(reply) => {
                        let _ = reply.send(controller.pause().map(|_| controller.snapshot()));
                    }
                    Command::Resume(reply) => {
                        let result = controller.resume().map(|_| controller.snapshot());
                        ticker = new_ticker();
                        let _ = reply.send(result);
                    }
                    Command::Stop(reply) => {
                        let _ = reply.send(controller.stop().map(|_| controller.snapshot()));
                    }
                    Command::ReRecord(reply) => {
                        let _ = reply.send(controller.re_record().map(|_| controller.snapshot()));
                    }
                    Command::Submit(reply) => match controller.begin_submit() {
                        Ok(upload) => {
                            let uploader = controller.uploader();
                            let done = upload_tx.clone();
                            tokio::spawn(async move {
                                let result = uploader.submit(&upload.artifact, &upload.metadata).await;
                                if done.send(result).await.is_err() {
                                    warn!("Session ended before the upload finished");
                                }
                            });
                            pending_submit = Some(reply);
                        }
                        Err(e) => {
                            let _ = reply.send(Err(e));
                        }
                    },
                    Command::Snapshot(reply) => {
                        let _ = reply.send(controller.snapshot());
                    }
                    Command::Artifact(reply) => {
                        let _ = reply.send(controller.artifact().cloned());
                    }
                    Command::Shutdown(ack) => {
                        controller.shutdown();
                        snapshots.send_replace(controller.snapshot());
                        let _ = ack.send(());
                        break;
                    }
                }
            }
            _ = ticker.tick(), if controller.is_ticking() => {
                controller.tick();
            }
            Some(result) = upload_rx.recv() => {
                let outcome = controller.finish_submit(result).map(|_| controller.snapshot());
                if let Some(reply) = pending_submit.take() {
                    let _ = reply.send(outcome);
                }
            }
        }

        snapshots.send_replace(controller.snapshot());
    }

    controller.shutdown();
    info!("Session task {} finished", controller.id());
}
