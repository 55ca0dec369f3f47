use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use wsnotify_core::tasks::TaskError;
use wsnotify_sdk::objects::EventKind;
use wsnotify_sdk::objects::admin::{StartTaskRequest, TaskOwnerResponse, TaskStatusRequest};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, receipt};

/// `POST /tasks`: start tracking a task.
///
/// Maps the task to its session and publishes the first
/// `cb_session_task_info_updated` event with `running: true`. Responds
/// `409` if the task id is still live.
pub async fn start_task(
    state: State<AppState>,
    _auth: AdminAuth,
    Json(req): Json<StartTaskRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    let accepted = state.tasks.start(
        &state.publisher,
        &req.task_id,
        req.session_id,
        req.user_id,
        req.status_name,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(receipt(EventKind::SessionTaskInfoUpdated, accepted)),
    ))
}

/// `GET /tasks/{task_id}`: show which session owns a live task.
pub async fn show_task(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, AdminApiError> {
    let owner = state
        .tasks
        .owner(&task_id)
        .ok_or_else(|| TaskError::UnknownTask(task_id.clone()))?;

    Ok(Json(TaskOwnerResponse {
        task_id,
        session_id: owner.session_id,
        user_id: owner.user_id,
    }))
}

/// `POST /tasks/{task_id}/status`: publish a task status update.
///
/// A `running: false` update is terminal: once it is published the task id
/// is released and may be started again.
pub async fn report_task_status(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(task_id): Path<String>,
    Json(req): Json<TaskStatusRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    let accepted = state
        .tasks
        .report(&state.publisher, &task_id, req.status_name, req.running)?;

    Ok(Json(receipt(EventKind::SessionTaskInfoUpdated, accepted)))
}

/// `DELETE /tasks/{task_id}`: drop a task mapping without publishing.
///
/// Used to release a task whose terminal update could not be delivered.
pub async fn abandon_task(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, AdminApiError> {
    state
        .tasks
        .abandon(&task_id)
        .ok_or(TaskError::UnknownTask(task_id))?;

    Ok(StatusCode::NO_CONTENT)
}
