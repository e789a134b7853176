//! Configuration management for Pagecast Server

use std::env;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::relay::RelayConfig;
use crate::session::DEFAULT_VIEWER_BUFFER;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub render: RenderConfig,
    pub viewers: ViewerConfig,
    pub relay: RelaySettings,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub documents_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub scale: f32,
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Snapshots queued per viewer before it counts as lagging
    pub buffer: usize,
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub enabled: bool,
    pub broker: RelayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            storage: StorageConfig {
                documents_dir: PathBuf::from("resources"),
            },
            render: RenderConfig { scale: 1.0 },
            viewers: ViewerConfig {
                buffer: DEFAULT_VIEWER_BUFFER,
            },
            relay: RelaySettings {
                enabled: true,
                broker: RelayConfig {
                    host: "broker.emqx.io".to_string(),
                    port: 1883,
                    topic: "python/mqtt".to_string(),
                    client_id: default_client_id(),
                },
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            storage: StorageConfig {
                documents_dir: env::var("DOCUMENTS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.documents_dir),
            },
            render: RenderConfig {
                scale: parse_var("RENDER_SCALE", defaults.render.scale)?,
            },
            viewers: ViewerConfig {
                buffer: parse_var("VIEWER_BUFFER", defaults.viewers.buffer)?,
            },
            relay: RelaySettings {
                enabled: parse_var("RELAY_ENABLED", defaults.relay.enabled)?,
                broker: RelayConfig {
                    host: env::var("MQTT_HOST").unwrap_or(defaults.relay.broker.host),
                    port: parse_var("MQTT_PORT", defaults.relay.broker.port)?,
                    topic: env::var("MQTT_TOPIC").unwrap_or(defaults.relay.broker.topic),
                    client_id: env::var("MQTT_CLIENT_ID")
                        .unwrap_or(defaults.relay.broker.client_id),
                },
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

fn default_client_id() -> String {
    format!("pagecast-{}", Uuid::new_v4().simple())
}
