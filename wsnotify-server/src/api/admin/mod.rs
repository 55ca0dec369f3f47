//! Admin API handlers.
//!
//! These endpoints are called by backend services to report domain facts
//! and require the `Wsnotify-Admin-Authorization` header with the plaintext
//! admin secret. Each one publishes exactly one event.
//!
//! # Endpoints
//!
//! - `POST   /tasks`                                - start a task, publish its first status
//! - `GET    /tasks/{task_id}`                      - show the owner of a live task
//! - `POST   /tasks/{task_id}/status`               - publish a task status update
//! - `DELETE /tasks/{task_id}`                      - forget a task without publishing
//! - `POST   /sessions/{session_id}/expired`        - publish `cb_session_expired`
//! - `POST   /sessions/{session_id}/state`          - publish `cb_session_state`
//! - `POST   /sessions/{session_id}/log-updated`    - publish `cb_session_log_updated`
//! - `POST   /config/changed`                       - broadcast `cb_config_changed`

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use wsnotify_core::events::{Accepted, DeliveryError, PublishError};
use wsnotify_core::tasks::TaskError;
use wsnotify_sdk::objects::EventKind;
use wsnotify_sdk::objects::admin::PublishReceipt;

use crate::state::AppState;

mod config;
mod sessions;
mod tasks;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(tasks::start_task))
        .route(
            "/tasks/{task_id}",
            get(tasks::show_task).delete(tasks::abandon_task),
        )
        .route("/tasks/{task_id}/status", post(tasks::report_task_status))
        .route(
            "/sessions/{session_id}/expired",
            post(sessions::session_expired),
        )
        .route("/sessions/{session_id}/state", post(sessions::session_state))
        .route(
            "/sessions/{session_id}/log-updated",
            post(sessions::session_log_updated),
        )
        .route("/config/changed", post(config::config_changed))
}

fn receipt(kind: EventKind, accepted: Accepted) -> PublishReceipt {
    PublishReceipt {
        event_id: kind.id().to_owned(),
        topic: kind.topic(),
        recipients: accepted.recipients,
    }
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Task(TaskError),
    Publish(PublishError),
}

impl From<TaskError> for AdminApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Publish(e) => AdminApiError::Publish(e),
            other => AdminApiError::Task(other),
        }
    }
}

impl From<PublishError> for AdminApiError {
    fn from(err: PublishError) -> Self {
        AdminApiError::Publish(err)
    }
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::Task(e @ TaskError::StaleTaskMapping { .. }) => {
                (StatusCode::CONFLICT, e.to_string()).into_response()
            }
            AdminApiError::Task(e @ TaskError::UnknownTask(_)) => {
                (StatusCode::NOT_FOUND, e.to_string()).into_response()
            }
            AdminApiError::Task(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            AdminApiError::Publish(e @ PublishError::UnknownTopic(_)) => {
                tracing::warn!(error = %e, "Admin API: event topic not enabled");
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
            }
            AdminApiError::Publish(PublishError::Delivery(e)) => {
                tracing::error!(error = %e, "Admin API: event delivery failed");
                let status = match e {
                    DeliveryError::Closed => StatusCode::SERVICE_UNAVAILABLE,
                    DeliveryError::Rejected(_) => StatusCode::BAD_GATEWAY,
                };
                (status, "event delivery failed").into_response()
            }
        }
    }
}
