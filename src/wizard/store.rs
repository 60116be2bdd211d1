use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::{StoryMetadata, WizardState, WizardStep};
use crate::error::StoreError;

pub const STEP_KEY: &str = "record_step";
pub const META_KEY: &str = "record_meta";

/// String key/value persistence, last write wins
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One file per key inside a state directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state directory: {:?}", dir))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", key)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let tmp = self.dir.join(format!(".{}.tmp", key));
        fs::write(&tmp, value).with_context(|| format!("Failed to write {}", key))?;
        fs::rename(&tmp, self.path(key)).with_context(|| format!("Failed to replace {}", key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", key)),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Persists wizard progress under two fixed keys
#[derive(Clone)]
pub struct WizardStore {
    backend: Arc<dyn KeyValueStore>,
}

impl WizardStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Arc::new(FileStore::open(dir)?)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn read(&self, key: &'static str) -> Result<Option<String>, StoreError> {
        self.backend
            .get(key)
            .map_err(|e| StoreError::MalformedPersistedState {
                key,
                reason: format!("{:#}", e),
            })
    }

    /// Load persisted progress, reporting corrupt entries
    pub fn try_load(&self) -> Result<WizardState, StoreError> {
        let step = match self.read(STEP_KEY)? {
            None => WizardStep::default(),
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .map_err(|e| e.to_string())
                .and_then(WizardStep::try_from)
                .map_err(|reason| StoreError::MalformedPersistedState {
                    key: STEP_KEY,
                    reason,
                })?,
        };

        let metadata = match self.read(META_KEY)? {
            None => None,
            Some(raw) => Some(serde_json::from_str::<StoryMetadata>(&raw).map_err(|e| {
                StoreError::MalformedPersistedState {
                    key: META_KEY,
                    reason: e.to_string(),
                }
            })?),
        };

        if step == WizardStep::Recording && metadata.is_none() {
            debug!("Recording step persisted without details, returning to details");
            return Ok(WizardState {
                step: WizardStep::Details,
                metadata: None,
            });
        }

        Ok(WizardState { step, metadata })
    }

    /// Load persisted progress, falling back to defaults on corruption
    pub fn load(&self) -> WizardState {
        match self.try_load() {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring persisted wizard state: {}", e);
                WizardState::default()
            }
        }
    }

    pub fn set_step(&self, step: WizardStep) {
        let value = u8::from(step).to_string();
        match self.backend.set(STEP_KEY, &value) {
            Ok(()) => debug!("Persisted wizard step {}", value),
            Err(e) => warn!("Failed to persist wizard step: {:#}", e),
        }
    }

    pub fn set_metadata(&self, metadata: &StoryMetadata) {
        let json = match serde_json::to_string(metadata) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize story details: {}", e);
                return;
            }
        };
        if let Err(e) = self.backend.set(META_KEY, &json) {
            warn!("Failed to persist story details: {:#}", e);
        }
    }

    /// Persist the step and, when present, the metadata (fire-and-forget)
    ///
    /// `None` leaves earlier details in place, so a load only mirrors the
    /// saved state when it carries metadata or the store started empty.
    pub fn save(&self, state: &WizardState) {
        self.set_step(state.step);
        if let Some(metadata) = &state.metadata {
            self.set_metadata(metadata);
        }
    }

    /// Remove both keys after a successful submission
    pub fn clear(&self) {
        for key in [STEP_KEY, META_KEY] {
            if let Err(e) = self.backend.remove(key) {
                warn!("Failed to clear {}: {:#}", key, e);
            }
        }
        info!("Wizard progress cleared");
    }
}
