//! Mutate-then-broadcast orchestration
//!
//! Every command that changes what viewers see runs under one command lock:
//! apply the mutation, compute the snapshot, fan it out. Holding the lock
//! across the fan-out is cheap (delivery only enqueues) and gives every
//! viewer its snapshots in mutation order.

use std::sync::Arc;

use parking_lot::Mutex;

use super::error::SessionResult;
use super::registry::{Delivery, Viewer, ViewerHandle, ViewerRegistry};
use super::state::{DocumentHandle, SessionSnapshot, SessionState};

pub struct SyncBroadcaster {
    state: Arc<SessionState>,
    registry: Arc<ViewerRegistry>,
    commands: Mutex<()>,
}

impl SyncBroadcaster {
    pub fn new(state: Arc<SessionState>, registry: Arc<ViewerRegistry>) -> Self {
        Self {
            state,
            registry,
            commands: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn registry(&self) -> &ViewerRegistry {
        &self.registry
    }

    /// Load a document and broadcast the reset session
    pub fn load(&self, handle: DocumentHandle) -> SessionSnapshot {
        let _guard = self.commands.lock();
        tracing::info!(
            document = %handle.name,
            pages = handle.page_count,
            "Loading document"
        );
        self.state.load_document(handle);
        self.publish()
    }

    /// Change page; nothing is broadcast when the change is rejected
    pub fn change_page(&self, index: i64) -> SessionResult<SessionSnapshot> {
        let _guard = self.commands.lock();
        self.state.set_page(index)?;
        tracing::info!(page = index, "Page changed");
        Ok(self.publish())
    }

    /// Register a viewer and broadcast the new count to everyone, itself included
    pub fn viewer_connected(&self, viewer: Viewer) -> SessionSnapshot {
        let _guard = self.commands.lock();
        let handle = viewer.handle();
        self.registry.add(viewer);
        tracing::info!(viewer_id = %handle, viewers = self.registry.size(), "Viewer connected");
        self.publish()
    }

    /// Unregister a viewer and broadcast the new count
    ///
    /// Returns false (and broadcasts nothing) if the viewer was already gone.
    pub fn viewer_disconnected(&self, handle: ViewerHandle) -> bool {
        let _guard = self.commands.lock();
        if !self.registry.remove(handle) {
            return false;
        }
        tracing::info!(viewer_id = %handle, viewers = self.registry.size(), "Viewer disconnected");
        self.publish();
        true
    }

    /// Answer a viewer's explicit `get_info` pull with the current snapshot
    pub fn send_snapshot_to(&self, handle: ViewerHandle) -> Option<Delivery> {
        let _guard = self.commands.lock();
        let delivery = self.registry.send_to(handle, self.snapshot().to_json())?;
        if delivery == Delivery::Gone {
            self.publish();
        }
        Some(delivery)
    }

    /// Current snapshot without broadcasting
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot(self.registry.size())
    }

    // Caller must hold the command lock.
    fn publish(&self) -> SessionSnapshot {
        let snapshot = self.snapshot();
        let mut report = self.registry.broadcast(&snapshot.to_json());

        // Pruning changes the viewer count, which survivors must see.
        while !report.pruned.is_empty() {
            let refreshed = self.snapshot();
            report = self.registry.broadcast(&refreshed.to_json());
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::error::SessionError;
    use crate::session::registry::ViewerReceiver;

    fn broadcaster() -> SyncBroadcaster {
        SyncBroadcaster::new(
            Arc::new(SessionState::new()),
            Arc::new(ViewerRegistry::new()),
        )
    }

    async fn next_snapshot(rx: &mut ViewerReceiver) -> SessionSnapshot {
        let text = rx.recv().await.expect("viewer channel closed");
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_connect_broadcasts_to_new_viewer() {
        let b = broadcaster();
        let (viewer, mut rx) = b.registry().new_viewer();

        let snap = b.viewer_connected(viewer);
        assert_eq!(snap.viewer_count, 1);

        let received = next_snapshot(&mut rx).await;
        assert_eq!(received.viewer_count, 1);
        assert_eq!(received.document_name, "No file loaded");
    }

    #[tokio::test]
    async fn test_rejected_page_change_is_not_broadcast() {
        let b = broadcaster();
        let (viewer, mut rx) = b.registry().new_viewer();
        b.viewer_connected(viewer);
        next_snapshot(&mut rx).await;

        assert_eq!(b.change_page(0), Err(SessionError::NoDocumentLoaded));
        b.load(DocumentHandle::new("deck.pdf", 3));
        next_snapshot(&mut rx).await;

        assert!(b.change_page(3).is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_scenario_sample_document() {
        let b = broadcaster();
        b.load(DocumentHandle::new("sample.pdf", 10));
        assert_eq!(
            b.snapshot(),
            SessionSnapshot {
                current_page: 0,
                total_pages: 10,
                document_name: "sample.pdf".to_string(),
                viewer_count: 0,
            }
        );

        let (viewer, mut rx) = b.registry().new_viewer();
        let handle = viewer.handle();
        b.viewer_connected(viewer);
        assert_eq!(next_snapshot(&mut rx).await.viewer_count, 1);

        b.change_page(5).unwrap();
        assert_eq!(next_snapshot(&mut rx).await.current_page, 5);

        assert_eq!(
            b.change_page(10),
            Err(SessionError::InvalidPage {
                index: 10,
                page_count: 10
            })
        );
        assert_eq!(b.snapshot().current_page, 5);

        assert!(b.viewer_disconnected(handle));
        assert_eq!(b.snapshot().viewer_count, 0);
    }

    #[tokio::test]
    async fn test_disconnect_twice_broadcasts_once() {
        let b = broadcaster();
        let (a, _a_rx) = b.registry().new_viewer();
        let (other, mut other_rx) = b.registry().new_viewer();
        let a_handle = a.handle();
        b.viewer_connected(other);
        b.viewer_connected(a);
        next_snapshot(&mut other_rx).await;
        next_snapshot(&mut other_rx).await;

        assert!(b.viewer_disconnected(a_handle));
        assert_eq!(next_snapshot(&mut other_rx).await.viewer_count, 1);

        assert!(!b.viewer_disconnected(a_handle));
        assert!(other_rx.try_recv().is_err());
        assert_eq!(b.snapshot().viewer_count, 1);
    }

    #[tokio::test]
    async fn test_failed_send_rebroadcasts_new_count() {
        let b = broadcaster();
        let (dead, dead_rx) = b.registry().new_viewer();
        let (live, mut live_rx) = b.registry().new_viewer();
        b.viewer_connected(dead);
        b.viewer_connected(live);
        assert_eq!(next_snapshot(&mut live_rx).await.viewer_count, 2);
        drop(dead_rx);

        b.load(DocumentHandle::new("deck.pdf", 4));

        let first = next_snapshot(&mut live_rx).await;
        assert_eq!(first.viewer_count, 2);
        assert_eq!(first.total_pages, 4);
        let second = next_snapshot(&mut live_rx).await;
        assert_eq!(second.viewer_count, 1);
        assert_eq!(b.registry().size(), 1);
    }

    #[tokio::test]
    async fn test_get_info_goes_to_requester_only() {
        let b = broadcaster();
        let (a, mut a_rx) = b.registry().new_viewer();
        let (other, mut other_rx) = b.registry().new_viewer();
        let a_handle = a.handle();
        b.viewer_connected(a);
        b.viewer_connected(other);
        while a_rx.try_recv().is_ok() {}
        while other_rx.try_recv().is_ok() {}

        assert_eq!(b.send_snapshot_to(a_handle), Some(Delivery::Sent));
        assert_eq!(next_snapshot(&mut a_rx).await.viewer_count, 2);
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_lagging_viewer_ends_on_latest_snapshot() {
        let b = SyncBroadcaster::new(
            Arc::new(SessionState::new()),
            Arc::new(ViewerRegistry::with_buffer(1)),
        );
        b.load(DocumentHandle::new("deck.pdf", 10));
        let (viewer, mut rx) = b.registry().new_viewer();
        b.viewer_connected(viewer);
        b.change_page(3).unwrap();
        b.change_page(7).unwrap();

        let mut last = None;
        while let Ok(text) = rx.try_recv() {
            last = Some(serde_json::from_str::<SessionSnapshot>(&text).unwrap());
        }

        assert_eq!(last, Some(b.snapshot()));
        assert_eq!(b.snapshot().current_page, 7);
    }

    #[tokio::test]
    async fn test_concurrent_commands_keep_invariant() {
        let b = Arc::new(broadcaster());
        b.load(DocumentHandle::new("deck.pdf", 20));

        let mut tasks = Vec::new();
        for i in 0..40i64 {
            let b = Arc::clone(&b);
            tasks.push(tokio::spawn(async move {
                if i % 10 == 0 {
                    b.load(DocumentHandle::new("deck.pdf", 20));
                } else {
                    let _ = b.change_page(i % 25);
                }
                let snap = b.snapshot();
                assert!(snap.current_page < snap.total_pages);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }
}
