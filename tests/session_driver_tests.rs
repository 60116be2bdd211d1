// Integration tests for the session task
//
// Time is paused so the one-second clock can be driven deterministically.

mod common;

use anyhow::Result;
use common::{fixture, fixture_with, FakeSource, FakeUploader};
use std::time::Duration;
use story_recorder::error::SessionError;
use story_recorder::session::SessionHandle;
use story_recorder::SessionStatus;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_clock_stops_session_at_limit() -> Result<()> {
    let f = fixture();
    let handle = SessionHandle::spawn(f.controller);

    let started = handle.start().await?;
    assert_eq!(started.status, SessionStatus::Recording);
    assert_eq!(started.elapsed_seconds, 0);

    sleep(Duration::from_millis(300_500)).await;
    let snapshot = handle.snapshot().await?;
    assert_eq!(snapshot.elapsed_seconds, 300);
    assert!(snapshot.warning_message.is_some());

    sleep(Duration::from_secs(61)).await;
    let snapshot = handle.snapshot().await?;
    assert_eq!(snapshot.status, SessionStatus::Stopped);
    assert_eq!(snapshot.elapsed_seconds, 360);
    assert!(snapshot.time_limit_reached);
    assert!(snapshot.artifact.is_some());
    assert!(!f.probe.lock().unwrap().open);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_paused_session_does_not_tick() -> Result<()> {
    let f = fixture();
    let handle = SessionHandle::spawn(f.controller);

    handle.start().await?;
    sleep(Duration::from_millis(10_500)).await;

    let paused = handle.pause().await?;
    assert_eq!(paused.status, SessionStatus::Paused);
    assert_eq!(paused.elapsed_seconds, 10);

    sleep(Duration::from_secs(100)).await;
    assert_eq!(handle.snapshot().await?.elapsed_seconds, 10);

    handle.resume().await?;
    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(handle.snapshot().await?.elapsed_seconds, 15);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_submit_failure_then_retry() -> Result<()> {
    let (source, probe) = FakeSource::new();
    let f = fixture_with(source, probe, FakeUploader::failing_times(1));
    let uploader = f.uploader.clone();
    let handle = SessionHandle::spawn(f.controller);

    handle.start().await?;
    sleep(Duration::from_millis(3_500)).await;
    let stopped = handle.stop().await?;
    let artifact_id = stopped.artifact.as_ref().map(|a| a.id);

    let err = handle.submit().await.unwrap_err();
    assert!(matches!(err, SessionError::Submission(_)));
    let failed = handle.latest();
    assert_eq!(failed.status, SessionStatus::Failed);
    assert_eq!(failed.artifact.as_ref().map(|a| a.id), artifact_id);
    assert_eq!(failed.error.as_deref(), Some("Failed to submit story. Please try again."));

    let submitted = handle.submit().await?;
    assert_eq!(submitted.status, SessionStatus::Submitted);
    assert_eq!(submitted.leave_warning, None);
    assert_eq!(uploader.call_count(), 2);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_every_second() -> Result<()> {
    let f = fixture();
    let handle = SessionHandle::spawn(f.controller);
    let mut updates = handle.subscribe();

    handle.start().await?;
    updates.borrow_and_update();

    let mut seen = Vec::new();
    while seen.len() < 3 {
        updates.changed().await?;
        let elapsed = updates.borrow_and_update().elapsed_seconds;
        if elapsed > 0 && seen.last() != Some(&elapsed) {
            seen.push(elapsed);
        }
    }
    assert_eq!(seen, vec![1, 2, 3]);

    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_device_and_closes() -> Result<()> {
    let f = fixture();
    let handle = SessionHandle::spawn(f.controller);

    handle.start().await?;
    assert!(f.probe.lock().unwrap().open);

    handle.shutdown().await;

    assert!(!f.probe.lock().unwrap().open);
    assert_eq!(handle.latest().status, SessionStatus::Idle);
    assert_eq!(handle.start().await.unwrap_err(), SessionError::Closed);
    Ok(())
}
