use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::audio::SourceFactory;
use crate::session::{RecordingSessionController, SessionHandle};
use crate::submission::Uploader;
use crate::wizard::{StoryMetadata, WizardStep, WizardStore};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: WizardStore,
    /// The recording step's session; at most one per process
    pub session: Arc<RwLock<Option<SessionHandle>>>,
    sources: Arc<dyn SourceFactory>,
    uploader: Arc<dyn Uploader>,
}

impl AppState {
    pub fn new(store: WizardStore, sources: Arc<dyn SourceFactory>, uploader: Arc<dyn Uploader>) -> Self {
        Self {
            store,
            session: Arc::new(RwLock::new(None)),
            sources,
            uploader,
        }
    }

    /// Replace the current session with a fresh one for `metadata`
    pub async fn open_session(&self, metadata: StoryMetadata) -> SessionHandle {
        let controller = RecordingSessionController::new(
            metadata,
            self.sources.create(),
            Arc::clone(&self.uploader),
            self.store.clone(),
        );

        // Release the previous device before a new one can be requested
        let mut session = self.session.write().await;
        if let Some(previous) = session.take() {
            previous.shutdown().await;
        }

        let handle = SessionHandle::spawn(controller);
        *session = Some(handle.clone());
        handle
    }

    pub async fn current_session(&self) -> Option<SessionHandle> {
        self.session.read().await.clone()
    }

    pub async fn close_session(&self) -> bool {
        let previous = self.session.write().await.take();
        match previous {
            Some(handle) => {
                handle.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// Re-create the recording step after a restart
    pub async fn restore(&self) {
        let state = self.store.load();
        if let (WizardStep::Recording, Some(metadata)) = (state.step, state.metadata) {
            info!("Restoring recording step from persisted progress");
            self.open_session(metadata).await;
        }
    }
}
