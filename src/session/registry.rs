//! Registry of live viewer connections
//!
//! Each viewer owns a bounded outbound queue. The transport side drains the
//! queue in its own task, so fan-out here never waits on a socket: a slow
//! viewer fills only its own queue, and a dead one is detected by its queue
//! being closed.
//!
//! Behind the queue sits a single overflow slot. Once the queue is full, new
//! payloads overwrite the slot instead of being dropped, and the receiver
//! hands the slot out after the queue drains. A viewer that falls behind
//! therefore skips intermediate snapshots but always ends on the newest one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::{
    self,
    error::{TryRecvError, TrySendError},
};
use uuid::Uuid;

/// Default capacity of a viewer's outbound queue
pub const DEFAULT_VIEWER_BUFFER: usize = 32;

/// Opaque identity of a viewer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewerHandle(Uuid);

impl ViewerHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ViewerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A live connection: identity plus the ability to push text to it
#[derive(Debug, Clone)]
pub struct Viewer {
    handle: ViewerHandle,
    sender: mpsc::Sender<String>,
    overflow: Arc<Mutex<Option<String>>>,
}

impl Viewer {
    /// Create a viewer and the receiving end its transport should drain
    pub fn channel(buffer: usize) -> (Self, ViewerReceiver) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let overflow = Arc::new(Mutex::new(None));
        let viewer = Self {
            handle: ViewerHandle::new(),
            sender,
            overflow: Arc::clone(&overflow),
        };
        (viewer, ViewerReceiver { receiver, overflow })
    }

    pub fn handle(&self) -> ViewerHandle {
        self.handle
    }

    // The overflow lock is held across the send so the receiver never sees
    // an empty queue and an empty slot while a payload is in between.
    fn push(&self, payload: String) -> Delivery {
        let mut overflow = self.overflow.lock();

        if overflow.is_some() {
            if self.sender.is_closed() {
                return Delivery::Gone;
            }
            *overflow = Some(payload);
            return Delivery::Lagging;
        }

        match self.sender.try_send(payload) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(payload)) => {
                *overflow = Some(payload);
                Delivery::Lagging
            }
            Err(TrySendError::Closed(_)) => Delivery::Gone,
        }
    }
}

/// Receiving end of a viewer connection
///
/// Yields queued payloads in order, then the newest overflowed payload if
/// the queue ever filled up.
#[derive(Debug)]
pub struct ViewerReceiver {
    receiver: mpsc::Receiver<String>,
    overflow: Arc<Mutex<Option<String>>>,
}

impl ViewerReceiver {
    /// Wait for the next payload; `None` once the viewer has been dropped
    /// from the registry and everything pending has been handed out.
    pub async fn recv(&mut self) -> Option<String> {
        match self.try_recv() {
            Ok(payload) => return Some(payload),
            Err(TryRecvError::Disconnected) => return None,
            Err(TryRecvError::Empty) => {}
        }

        match self.receiver.recv().await {
            Some(payload) => Some(payload),
            None => self.overflow.lock().take(),
        }
    }

    pub fn try_recv(&mut self) -> Result<String, TryRecvError> {
        let mut overflow = self.overflow.lock();
        match self.receiver.try_recv() {
            Ok(payload) => Ok(payload),
            Err(err) => overflow.take().ok_or(err),
        }
    }
}

/// Outcome of pushing one payload to one viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Queue full; the payload replaced the viewer's overflow slot
    Lagging,
    /// Connection closed; the viewer has been removed
    Gone,
}

/// Summary of a fan-out
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub lagging: usize,
    pub pruned: Vec<ViewerHandle>,
}

/// Concurrent set of live viewers
pub struct ViewerRegistry {
    viewers: RwLock<HashMap<ViewerHandle, Viewer>>,
    buffer: usize,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_VIEWER_BUFFER)
    }

    /// Create a registry whose viewers queue up to `buffer` payloads
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
            buffer,
        }
    }

    /// Create a viewer sized for this registry (not yet added)
    pub fn new_viewer(&self) -> (Viewer, ViewerReceiver) {
        Viewer::channel(self.buffer)
    }

    pub fn add(&self, viewer: Viewer) {
        self.viewers.write().insert(viewer.handle, viewer);
    }

    /// Remove a viewer. Returns false if it was already gone.
    pub fn remove(&self, handle: ViewerHandle) -> bool {
        self.viewers.write().remove(&handle).is_some()
    }

    pub fn contains(&self, handle: ViewerHandle) -> bool {
        self.viewers.read().contains_key(&handle)
    }

    pub fn size(&self) -> usize {
        self.viewers.read().len()
    }

    /// Push a payload to a single viewer
    ///
    /// Returns `None` if the viewer is not registered. A closed connection
    /// is removed, same as during a broadcast.
    pub fn send_to(&self, handle: ViewerHandle, payload: String) -> Option<Delivery> {
        let viewer = self.viewers.read().get(&handle).cloned()?;
        let delivery = viewer.push(payload);
        if delivery == Delivery::Gone {
            self.remove(handle);
        }
        Some(delivery)
    }

    /// Deliver `payload` to every registered viewer
    ///
    /// Failures never abort the loop or surface to the caller; viewers whose
    /// connection is closed are removed and listed in the report.
    pub fn broadcast(&self, payload: &str) -> BroadcastReport {
        let viewers: Vec<Viewer> = self.viewers.read().values().cloned().collect();
        let mut report = BroadcastReport::default();

        for viewer in &viewers {
            match viewer.push(payload.to_owned()) {
                Delivery::Sent => report.delivered += 1,
                Delivery::Lagging => {
                    tracing::warn!(viewer_id = %viewer.handle, "Viewer queue full, coalescing snapshot");
                    report.lagging += 1;
                }
                Delivery::Gone => report.pruned.push(viewer.handle),
            }
        }

        if !report.pruned.is_empty() {
            let mut registered = self.viewers.write();
            report.pruned.retain(|handle| registered.remove(handle).is_some());
        }

        for handle in &report.pruned {
            tracing::debug!(viewer_id = %handle, "Pruned disconnected viewer");
        }

        report
    }
}

impl Default for ViewerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
