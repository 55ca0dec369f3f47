//! Serde mirror of `wsnotify-config.toml`.
//!
//! Only `[admin]` is required; every other section falls back to defaults.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use wsnotify_core::events::DEFAULT_SUBSCRIBER_BUFFER;
use wsnotify_sdk::objects::Topic;

/// The whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

/// `[server]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds, `0.0.0.0:8080` by default.
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// `[admin]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Plaintext on first start, an argon2 PHC string after the loader has
    /// rewritten the file.
    pub secret: String,
}

/// Event routing configuration.
///
/// Read once at startup; changing it requires a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Topic names this deployment serves.
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    /// Queue size of each WebSocket topic subscription.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

fn default_topics() -> Vec<String> {
    Topic::ALL.iter().map(|t| t.as_str().to_owned()).collect()
}

fn default_subscriber_buffer() -> usize {
    DEFAULT_SUBSCRIBER_BUFFER
}

impl FileConfig {
    /// `true` once `admin.secret` holds an argon2 PHC string.
    pub fn is_admin_secret_hashed(&self) -> bool {
        self.admin.secret.starts_with("$argon2")
    }
}
