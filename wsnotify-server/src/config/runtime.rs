//! Validated runtime configuration.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use std::net::SocketAddr;
use wsnotify_core::events::TopicRegistry;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Admin API credentials.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// PHC string produced by argon2.
    pub secret_hash: String,
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Check a secret from the `Wsnotify-Admin-Authorization` header.
    ///
    /// An unparsable hash never verifies.
    pub fn verify_secret(&self, plaintext: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Event routing configuration, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct EventsConfig {
    pub registry: TopicRegistry,
    pub subscriber_buffer: usize,
}

/// The parts of the configuration that a SIGHUP reload may replace.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
}
