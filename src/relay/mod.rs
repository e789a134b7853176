//! Chat relay
//!
//! Chat messages bypass the session entirely: they are handed to an external
//! publish/subscribe bus and forgotten. Publishing never reports failure to
//! the caller.

mod mqtt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use mqtt::{MqttRelay, RelayConfig};

/// Capacity of the in-process relay bus
const LOCAL_BUFFER_SIZE: usize = 256;

/// A chat message on its way to the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub body: String,
    pub sender: String,
    #[serde(rename = "isOwner")]
    pub is_owner: bool,
}

/// Fire-and-forget message bus
pub trait RelayPort: Send + Sync {
    /// Publish a message; failures are swallowed
    fn publish(&self, message: ChatMessage);

    /// Release connections held by the relay
    fn shutdown(&self) {}
}

/// In-process relay backed by a broadcast channel
///
/// Used when the external broker is disabled; local subscribers still see
/// every message.
#[derive(Debug, Clone)]
pub struct LocalRelay {
    tx: broadcast::Sender<ChatMessage>,
}

impl LocalRelay {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(LOCAL_BUFFER_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatMessage> {
        self.tx.subscribe()
    }
}

impl Default for LocalRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayPort for LocalRelay {
    fn publish(&self, message: ChatMessage) {
        tracing::debug!(sender = %message.sender, is_owner = message.is_owner, "Relaying chat message locally");
        // No subscribers is not an error for a fire-and-forget bus
        let _ = self.tx.send(message);
    }
}
