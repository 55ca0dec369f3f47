//! Request and response types for the Admin API.
//!
//! The Admin API is how backend services report domain facts (task state
//! transitions, session lifecycle changes) so the gateway can push the
//! matching events to connected clients.

use serde::{Deserialize, Serialize};

use super::topic::Topic;

/// Header carrying the plaintext admin secret.
pub const ADMIN_AUTHORIZATION_HEADER: &str = "Wsnotify-Admin-Authorization";

/// `POST /api/admin/tasks` – start tracking a task and announce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTaskRequest {
    pub task_id: String,
    /// Session that owns the task; every status event is scoped to it.
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_name: Option<String>,
}

/// `POST /api/admin/tasks/{task_id}/status` – report task progress.
///
/// `running: false` is the terminal update; the task id may be reused
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_name: Option<String>,
    pub running: bool,
}

/// Optional user scope for session-level notices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNoticeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Returned by every endpoint that publishes an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub event_id: String,
    pub topic: Topic,
    /// Subscriptions the event was queued for.
    pub recipients: usize,
}

/// `GET /api/admin/tasks/{task_id}` – current owner of a live task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOwnerResponse {
    pub task_id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}
