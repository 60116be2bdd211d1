// Integration tests for persisted wizard progress

mod common;

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use story_recorder::error::StoreError;
use story_recorder::wizard::{
    FileStore, KeyValueStore, MemoryStore, WizardState, WizardStep, WizardStore, META_KEY, STEP_KEY,
};
use tempfile::TempDir;

fn recording_state() -> WizardState {
    WizardState {
        step: WizardStep::Recording,
        metadata: Some(common::metadata()),
    }
}

#[test]
fn test_empty_store_starts_at_consent() {
    let store = WizardStore::in_memory();
    assert_eq!(store.load(), WizardState::default());
    assert_eq!(store.load().step, WizardStep::Consent);
}

#[test]
fn test_file_store_survives_reopen() -> Result<()> {
    let dir = TempDir::new()?;

    WizardStore::open_dir(dir.path())?.save(&recording_state());
    let reopened = WizardStore::open_dir(dir.path())?;

    assert_eq!(reopened.try_load()?, recording_state());
    Ok(())
}

#[test]
fn test_persisted_format() -> Result<()> {
    let dir = TempDir::new()?;
    WizardStore::open_dir(dir.path())?.save(&recording_state());

    assert_eq!(fs::read_to_string(dir.path().join(STEP_KEY))?, "2");
    let meta: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(META_KEY))?)?;
    assert_eq!(meta["name"], "Ada");
    assert_eq!(meta["storyTitle"], "The chipped mug");
    Ok(())
}

#[test]
fn test_save_without_metadata_keeps_previous_details() -> Result<()> {
    let store = WizardStore::in_memory();
    store.save(&recording_state());
    store.save(&WizardState {
        step: WizardStep::Details,
        metadata: None,
    });

    let state = store.try_load()?;
    assert_eq!(state.step, WizardStep::Details);
    assert_eq!(state.metadata, Some(common::metadata()));
    Ok(())
}

#[test]
fn test_round_trip_without_details_on_fresh_store() -> Result<()> {
    let store = WizardStore::in_memory();
    let state = WizardState {
        step: WizardStep::Details,
        metadata: None,
    };

    store.save(&state);
    assert_eq!(store.try_load()?, state);
    Ok(())
}

#[test]
fn test_malformed_step_is_reported_and_recovered() -> Result<()> {
    let backend = Arc::new(MemoryStore::new());
    backend.set(STEP_KEY, "seven")?;
    let store = WizardStore::new(backend.clone());

    assert!(matches!(
        store.try_load(),
        Err(StoreError::MalformedPersistedState { key: STEP_KEY, .. })
    ));
    assert_eq!(store.load(), WizardState::default());

    backend.set(STEP_KEY, "9")?;
    assert!(store.try_load().is_err());
    Ok(())
}

#[test]
fn test_malformed_metadata_is_reported_and_recovered() -> Result<()> {
    let backend = Arc::new(MemoryStore::new());
    backend.set(STEP_KEY, "2")?;
    backend.set(META_KEY, "{not json")?;
    let store = WizardStore::new(backend);

    assert!(matches!(
        store.try_load(),
        Err(StoreError::MalformedPersistedState { key: META_KEY, .. })
    ));
    assert_eq!(store.load(), WizardState::default());
    Ok(())
}

#[test]
fn test_recording_step_without_details_returns_to_details() -> Result<()> {
    let backend = Arc::new(MemoryStore::new());
    backend.set(STEP_KEY, "2")?;
    let store = WizardStore::new(backend);

    assert_eq!(
        store.try_load()?,
        WizardState {
            step: WizardStep::Details,
            metadata: None,
        }
    );
    Ok(())
}

#[test]
fn test_clear_removes_both_keys() -> Result<()> {
    let dir = TempDir::new()?;
    let store = WizardStore::open_dir(dir.path())?;
    store.save(&recording_state());

    store.clear();

    assert!(!dir.path().join(STEP_KEY).exists());
    assert!(!dir.path().join(META_KEY).exists());
    assert_eq!(store.load(), WizardState::default());

    // Clearing twice is harmless
    store.clear();
    Ok(())
}

#[test]
fn test_file_store_missing_key() -> Result<()> {
    let dir = TempDir::new()?;
    let backend = FileStore::open(dir.path().join("nested").join("state"))?;

    assert_eq!(backend.get("absent")?, None);
    backend.remove("absent")?;
    backend.set("present", "value")?;
    assert_eq!(backend.get("present")?, Some("value".to_string()));
    Ok(())
}

#[test]
fn test_single_key_updates() -> Result<()> {
    let store = WizardStore::in_memory();

    store.set_step(WizardStep::Details);
    assert_eq!(store.try_load()?.step, WizardStep::Details);

    store.set_metadata(&common::metadata());
    store.set_step(WizardStep::Recording);
    assert_eq!(store.try_load()?, recording_state());
    Ok(())
}
