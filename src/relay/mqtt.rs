//! MQTT relay client
//!
//! Publishes chat messages at QoS 0 on a fixed topic and subscribes to the
//! same topic, logging whatever the broker echoes back. The connection is
//! driven by a background task that reconnects on error.

use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;

use super::{ChatMessage, RelayPort};

/// Outstanding requests buffered between the client and the event loop
const REQUEST_CAPACITY: usize = 64;

/// Delay before polling again after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Broker connection settings
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
}

pub struct MqttRelay {
    client: AsyncClient,
    topic: String,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl MqttRelay {
    /// Connect to the broker and start the event loop task
    ///
    /// Must be called from within a tokio runtime. The connection itself is
    /// established lazily by the event loop; an unreachable broker only
    /// produces warnings.
    pub fn connect(config: &RelayConfig) -> Self {
        let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);

        let task = tokio::spawn(run_event_loop(
            event_loop,
            client.clone(),
            config.topic.clone(),
        ));

        tracing::info!(
            broker = %format!("{}:{}", config.host, config.port),
            topic = %config.topic,
            client_id = %config.client_id,
            "Chat relay started"
        );

        Self {
            client,
            topic: config.topic.clone(),
            event_loop: Mutex::new(Some(task)),
        }
    }
}

impl RelayPort for MqttRelay {
    fn publish(&self, message: ChatMessage) {
        let payload = match serde_json::to_vec(&message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to serialize chat message: {}", e);
                return;
            }
        };

        if let Err(e) = self
            .client
            .try_publish(self.topic.clone(), QoS::AtMostOnce, false, payload)
        {
            tracing::warn!(sender = %message.sender, "Chat message dropped: {}", e);
        }
    }

    fn shutdown(&self) {
        if let Err(e) = self.client.try_disconnect() {
            tracing::debug!("Relay disconnect request failed: {}", e);
        }
        if let Some(task) = self.event_loop.lock().take() {
            task.abort();
        }
        tracing::info!("Chat relay stopped");
    }
}

impl Drop for MqttRelay {
    fn drop(&mut self) {
        if let Some(task) = self.event_loop.get_mut().take() {
            task.abort();
        }
    }
}

// Subscribes on every ConnAck since a clean session drops subscriptions.
async fn run_event_loop(mut event_loop: EventLoop, client: AsyncClient, topic: String) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::info!(
                    topic = %publish.topic,
                    payload = %String::from_utf8_lossy(&publish.payload),
                    "Relay message received"
                );
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::debug!("Relay connected to broker");
                if let Err(e) = client.try_subscribe(topic.clone(), QoS::AtMostOnce) {
                    tracing::warn!(topic = %topic, "Failed to subscribe relay topic: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Relay connection error: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
