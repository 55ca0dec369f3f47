//! Topic names events are published to.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Logical channel an event is published to and subscriptions filter on.
///
/// The set is closed: adding a topic means adding a variant here. Which of
/// these topics a given deployment actually serves is decided by the
/// topic registry in `wsnotify-core`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    /// Server configuration changes.
    #[serde(rename = "cb_config")]
    ServerConfig,
    /// Session lifecycle notices (expiry, state heartbeats).
    #[serde(rename = "cb_session")]
    Session,
    /// Session log updates.
    #[serde(rename = "cb_session_log")]
    SessionLog,
    /// Status of asynchronous tasks owned by a session.
    #[serde(rename = "cb_session_task")]
    SessionTask,
}

impl Topic {
    /// Every topic, in declaration order.
    pub const ALL: [Topic; 4] = [
        Topic::ServerConfig,
        Topic::Session,
        Topic::SessionLog,
        Topic::SessionTask,
    ];

    /// The wire name of this topic.
    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::ServerConfig => "cb_config",
            Topic::Session => "cb_session",
            Topic::SessionLog => "cb_session_log",
            Topic::SessionTask => "cb_session_task",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A topic name that is not part of the topic vocabulary, or not enabled
/// in the registry it was resolved against.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid topic: {0}")]
pub struct InvalidTopicError(pub String);

impl FromStr for Topic {
    type Err = InvalidTopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| InvalidTopicError(s.to_owned()))
    }
}
