//! Application state management

use std::sync::Arc;

use crate::relay::RelayPort;
use crate::render::RenderPort;
use crate::session::{SessionGateway, SessionState, SyncBroadcaster, ViewerRegistry};
use crate::storage::DocumentStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    gateway: SessionGateway,
}

impl AppState {
    /// Wire a fresh, empty session to its collaborators
    pub fn new(
        store: DocumentStore,
        renderer: Arc<dyn RenderPort>,
        relay: Arc<dyn RelayPort>,
        viewer_buffer: usize,
    ) -> Self {
        let broadcaster = SyncBroadcaster::new(
            Arc::new(SessionState::new()),
            Arc::new(ViewerRegistry::with_buffer(viewer_buffer)),
        );

        Self {
            inner: Arc::new(AppStateInner {
                gateway: SessionGateway::new(broadcaster, store, renderer, relay),
            }),
        }
    }

    /// Get the session gateway
    pub fn gateway(&self) -> &SessionGateway {
        &self.inner.gateway
    }

    /// Release external connections before exit
    pub fn shutdown(&self) {
        tracing::info!("Shutting down application state...");
        self.inner.gateway.shutdown();
    }
}
