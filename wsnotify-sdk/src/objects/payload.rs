//! Variant-specific payloads carried by events.
//!
//! Each payload type is bound to exactly one [`EventKind`] through
//! [`Payload::KIND`], which is where an event's `id` and `topic` come from.
//! Payloads serialize as JSON objects so they can be flattened next to the
//! routing fields on the wire.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::event::{EventError, EventKind};

/// Data specific to one event variant.
pub trait Payload: Serialize + DeserializeOwned + Clone + std::fmt::Debug {
    /// The event kind this payload is published as.
    const KIND: EventKind;
}

/// The server configuration was saved or reloaded. Carries no data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfigurationChanged {}

impl Payload for ServerConfigurationChanged {
    const KIND: EventKind = EventKind::ServerConfigurationChanged;
}

/// Status update for an asynchronous task owned by a session.
///
/// A task emits one of these when it starts, zero or more while it makes
/// progress, and a final one with `running == false` when it completes or
/// is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSessionTaskInfo")]
pub struct SessionTaskInfo {
    task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_name: Option<String>,
    running: bool,
}

impl SessionTaskInfo {
    /// Create a task status payload.
    ///
    /// `status_name` of `None` means the running flag changed without a new
    /// status text. Fails if `task_id` is empty.
    pub fn new(
        task_id: impl Into<String>,
        status_name: Option<String>,
        running: bool,
    ) -> Result<Self, EventError> {
        let task_id = task_id.into();
        if task_id.is_empty() {
            return Err(EventError::EmptyTaskId);
        }
        Ok(Self {
            task_id,
            status_name,
            running,
        })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn status_name(&self) -> Option<&str> {
        self.status_name.as_deref()
    }

    /// `false` marks the terminal update for this task.
    pub fn running(&self) -> bool {
        self.running
    }

    pub fn is_terminal(&self) -> bool {
        !self.running
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSessionTaskInfo {
    task_id: String,
    #[serde(default)]
    status_name: Option<String>,
    running: bool,
}

impl TryFrom<RawSessionTaskInfo> for SessionTaskInfo {
    type Error = EventError;

    fn try_from(raw: RawSessionTaskInfo) -> Result<Self, Self::Error> {
        SessionTaskInfo::new(raw.task_id, raw.status_name, raw.running)
    }
}

impl Payload for SessionTaskInfo {
    const KIND: EventKind = EventKind::SessionTaskInfoUpdated;
}

/// The session has expired on the server side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionExpired {}

impl Payload for SessionExpired {
    const KIND: EventKind = EventKind::SessionExpired;
}

/// Periodic snapshot of a session's liveness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Last time the session was touched, as a unix timestamp in seconds.
    pub last_access_time: i64,
    /// Seconds left before the session expires.
    pub remaining_time: i64,
    pub is_valid: bool,
}

impl Payload for SessionState {
    const KIND: EventKind = EventKind::SessionState;
}

/// New entries are available in the session log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLogUpdated {}

impl Payload for SessionLogUpdated {
    const KIND: EventKind = EventKind::SessionLogUpdated;
}
