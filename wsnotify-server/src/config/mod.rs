//! Server configuration.
//!
//! [`file`] mirrors the TOML layout, [`runtime`] holds the validated values
//! the server runs with, and [`ConfigLoader`] turns one into the other.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{AdminConfig, EventsConfig, RuntimeConfig, ServerConfig};
use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wsnotify_core::events::TopicRegistry;
use wsnotify_sdk::objects::InvalidTopicError;

/// Why a configuration file could not be turned into a running config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("cannot hash admin secret: {0}")]
    Hash(String),

    #[error("events.topics: {0}")]
    InvalidTopic(#[from] InvalidTopicError),
}

/// Everything a successful load produces.
#[derive(Debug)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub events: EventsConfig,
}

impl LoadedConfig {
    /// Split into the reloadable part and the fixed event configuration.
    pub fn into_parts(self) -> (RuntimeConfig, EventsConfig) {
        (
            RuntimeConfig {
                server: self.server,
                admin: self.admin,
            },
            self.events,
        )
    }
}

/// Reads `wsnotify-config.toml`, applies CLI overrides and validates it.
///
/// Used once at startup and again on every SIGHUP.
pub struct ConfigLoader {
    path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load the file into a validated configuration.
    ///
    /// A plaintext admin secret is replaced by its argon2 hash and the file
    /// is written back, so the plaintext only lives on disk until the first
    /// start.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file = self.read()?;
        if let Some(listen) = self.listen_override {
            file.server.listen = listen;
        }

        let registry = validate(&file)?;
        let secret_hash = self.secure_admin_secret(&mut file)?;

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: file.server.listen,
            },
            admin: AdminConfig::new(secret_hash),
            events: EventsConfig {
                registry,
                subscriber_buffer: file.events.subscriber_buffer,
            },
        })
    }

    /// Same as [`ConfigLoader::load`]; named for the SIGHUP path.
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn read(&self) -> Result<FileConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        Ok(toml::from_str(&text)?)
    }

    fn secure_admin_secret(&self, file: &mut FileConfig) -> Result<String, ConfigError> {
        if file.is_admin_secret_hashed() {
            return Ok(file.admin.secret.clone());
        }

        file.admin.secret = hash_admin_secret(&file.admin.secret)?;
        self.persist(file)?;
        tracing::info!(path = ?self.path, "Replaced plaintext admin secret with its hash");
        Ok(file.admin.secret.clone())
    }

    /// Write `file` next to the original and rename it into place.
    fn persist(&self, file: &FileConfig) -> Result<(), ConfigError> {
        let encoded = toml::to_string_pretty(file)?;
        let staging = self.path.with_extension("toml.tmp");
        std::fs::write(&staging, encoded).map_err(|source| self.io_error(source))?;
        std::fs::rename(&staging, &self.path).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn validate(file: &FileConfig) -> Result<TopicRegistry, ConfigError> {
    if file.admin.secret.is_empty() {
        return Err(ConfigError::Invalid("admin.secret is empty".to_string()));
    }
    if file.events.subscriber_buffer == 0 {
        return Err(ConfigError::Invalid(
            "events.subscriber_buffer must be at least 1".to_string(),
        ));
    }

    let registry = TopicRegistry::from_names(&file.events.topics)?;
    if registry.is_empty() {
        return Err(ConfigError::Invalid("events.topics is empty".to_string()));
    }
    Ok(registry)
}

fn hash_admin_secret(plaintext: &str) -> Result<String, ConfigError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsnotify_sdk::objects::Topic;

    fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "wsnotify-{}-{}.toml",
            name,
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_hashes_plaintext_secret() {
        let path = write_config(
            "hash",
            "[admin]\nsecret = \"hunter2\"\n\n[events]\ntopics = [\"cb_config\", \"cb_session_task\"]\n",
        );
        let loader = ConfigLoader::new(&path, Some("127.0.0.1:9999".parse().unwrap()));

        let loaded = loader.load().unwrap();
        assert_eq!(loaded.server.listen.port(), 9999);
        assert!(loaded.admin.verify_secret("hunter2"));
        assert!(loaded.events.registry.contains(Topic::SessionTask));
        assert!(!loaded.events.registry.contains(Topic::Session));

        let rewritten: FileConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(rewritten.is_admin_secret_hashed());

        // A second load keeps the existing hash.
        let reloaded = loader.reload().unwrap();
        assert_eq!(reloaded.admin.secret_hash, loaded.admin.secret_hash);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unknown_topic_is_fatal() {
        let path = write_config(
            "topic",
            "[admin]\nsecret = \"s\"\n\n[events]\ntopics = [\"cb_config\", \"cb_bogus\"]\n",
        );
        let err = ConfigLoader::new(&path, None).load().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidTopic(InvalidTopicError(ref name)) if name == "cb_bogus"
        ));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_zero_buffer_is_rejected() {
        let path = write_config(
            "buffer",
            "[admin]\nsecret = \"s\"\n\n[events]\nsubscriber_buffer = 0\n",
        );
        let err = ConfigLoader::new(&path, None).load().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let path = std::env::temp_dir().join(format!(
            "wsnotify-missing-{}.toml",
            uuid::Uuid::new_v4()
        ));
        let err = ConfigLoader::new(&path, None).load().unwrap_err();
        assert!(matches!(err, ConfigError::Io { path: ref p, .. } if *p == path));
    }
}
