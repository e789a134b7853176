//! Command surface of the presentation session
//!
//! Transport-agnostic: HTTP handlers and the push channel both go through
//! here. Mutations are delegated to [`SyncBroadcaster`]; rendering, storage
//! and chat are delegated to their collaborators.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use crate::error::Result;
use crate::relay::{ChatMessage, RelayPort};
use crate::render::{RenderPort, RenderResult};
use crate::storage::DocumentStore;

use super::broadcaster::SyncBroadcaster;
use super::error::SessionError;
use super::registry::{Delivery, ViewerHandle, ViewerReceiver};
use super::state::{DocumentHandle, SessionSnapshot};

/// A freshly registered viewer
///
/// The receiver yields serialized snapshots; dropping it is how the
/// transport signals that the connection is gone.
pub struct ViewerConnection {
    pub handle: ViewerHandle,
    pub receiver: ViewerReceiver,
}

pub struct SessionGateway {
    broadcaster: SyncBroadcaster,
    store: DocumentStore,
    renderer: Arc<dyn RenderPort>,
    relay: Arc<dyn RelayPort>,
}

impl SessionGateway {
    pub fn new(
        broadcaster: SyncBroadcaster,
        store: DocumentStore,
        renderer: Arc<dyn RenderPort>,
        relay: Arc<dyn RelayPort>,
    ) -> Self {
        Self {
            broadcaster,
            store,
            renderer,
            relay,
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Names of all documents available to present
    pub async fn list_documents(&self) -> Result<Vec<String>> {
        Ok(self.store.list().await?)
    }

    /// Store an uploaded PDF and start presenting it
    pub async fn upload_document(&self, filename: &str, data: &[u8]) -> Result<DocumentHandle> {
        let (name, path) = self.store.save(filename, data).await?;
        let page_count = match self.renderer.page_count(&path).await {
            Ok(count) => count,
            Err(e) => {
                // An unreadable upload must not show up in the listing.
                if let Err(cleanup) = self.store.remove(&name).await {
                    tracing::warn!(file_name = %name, "Failed to remove rejected upload: {}", cleanup);
                }
                return Err(e.into());
            }
        };
        let handle = DocumentHandle::new(name, page_count);
        self.broadcaster.load(handle.clone());
        Ok(handle)
    }

    /// Start presenting a stored document
    pub async fn start_session(&self, filename: &str) -> Result<DocumentHandle> {
        let path = self.store.resolve(filename).await?;
        let page_count = self.renderer.page_count(&path).await?;
        self.load_document(filename, page_count).await
    }

    /// Load a stored document whose page count is already known
    pub async fn load_document(&self, name: &str, page_count: usize) -> Result<DocumentHandle> {
        let path = self.store.resolve(name).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name)
            .to_string();

        let handle = DocumentHandle::new(name, page_count);
        self.broadcaster.load(handle.clone());
        Ok(handle)
    }

    // ========================================================================
    // Pages
    // ========================================================================

    pub fn change_page(&self, index: i64) -> Result<()> {
        self.broadcaster.change_page(index)?;
        Ok(())
    }

    pub fn current_snapshot(&self) -> SessionSnapshot {
        self.broadcaster.snapshot()
    }

    /// Render the page currently being presented
    pub async fn render_current_page(&self) -> Result<Vec<u8>> {
        let (doc, page) = self.broadcaster.state().current()?;
        let path = self.store.resolve(&doc.name).await?;
        Ok(self.renderer.render_page(&path, page).await?)
    }

    /// Render every page of the current document, in order
    ///
    /// The document is captured when this is called; loading another one
    /// while the stream is consumed does not affect it.
    pub async fn render_document(&self) -> Result<BoxStream<'static, RenderResult<Vec<u8>>>> {
        let doc = self
            .broadcaster
            .state()
            .document()
            .ok_or(SessionError::NoDocumentLoaded)?;
        let path = self.store.resolve(&doc.name).await?;
        let renderer = Arc::clone(&self.renderer);

        let pages = stream::iter(0..doc.page_count)
            .then(move |index| {
                let renderer = Arc::clone(&renderer);
                let path = path.clone();
                async move { renderer.render_page(&path, index).await }
            })
            .boxed();

        Ok(pages)
    }

    /// Raw bytes of the current document
    pub async fn current_document(&self) -> Result<(String, Vec<u8>)> {
        let doc = self
            .broadcaster
            .state()
            .document()
            .ok_or(SessionError::NoDocumentLoaded)?;
        let data = self.store.read(&doc.name).await?;
        Ok((doc.name, data))
    }

    // ========================================================================
    // Viewers
    // ========================================================================

    pub fn viewer_count(&self) -> usize {
        self.broadcaster.registry().size()
    }

    /// Register a viewer; everyone, the new viewer included, gets a snapshot
    pub fn connect_viewer(&self) -> ViewerConnection {
        let (viewer, receiver) = self.broadcaster.registry().new_viewer();
        let handle = viewer.handle();
        self.broadcaster.viewer_connected(viewer);
        ViewerConnection { handle, receiver }
    }

    /// Unregister a viewer; a second call for the same handle is a no-op
    pub fn disconnect_viewer(&self, handle: ViewerHandle) {
        self.broadcaster.viewer_disconnected(handle);
    }

    /// Explicit `get_info` pull from one viewer
    pub fn request_info(&self, handle: ViewerHandle) -> Option<Delivery> {
        self.broadcaster.send_snapshot_to(handle)
    }

    // ========================================================================
    // Chat
    // ========================================================================

    /// Hand a chat message to the relay; never fails
    pub fn relay_message(&self, body: String, sender: String, is_owner: bool) {
        self.relay.publish(ChatMessage {
            body,
            sender,
            is_owner,
        });
    }

    pub fn shutdown(&self) {
        self.relay.shutdown();
    }
}
