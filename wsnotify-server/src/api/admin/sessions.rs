use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use wsnotify_sdk::objects::admin::SessionNoticeRequest;
use wsnotify_sdk::objects::{
    Payload, SessionExpired, SessionExpiredEvent, SessionLogUpdated, SessionLogUpdatedEvent,
    SessionState, SessionStateEvent,
};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, receipt};

/// `POST /sessions/{session_id}/expired?userId=`: tell a session it has expired.
pub async fn session_expired(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(session_id): Path<String>,
    Query(notice): Query<SessionNoticeRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    let event =
        SessionExpiredEvent::scoped(SessionExpired::default(), Some(session_id), notice.user_id);
    let accepted = state.publisher.publish(event)?;

    Ok(Json(receipt(SessionExpired::KIND, accepted)))
}

/// `POST /sessions/{session_id}/state?userId=`: push a session liveness snapshot.
pub async fn session_state(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(session_id): Path<String>,
    Query(notice): Query<SessionNoticeRequest>,
    Json(snapshot): Json<SessionState>,
) -> Result<impl IntoResponse, AdminApiError> {
    let event = SessionStateEvent::scoped(snapshot, Some(session_id), notice.user_id);
    let accepted = state.publisher.publish(event)?;

    Ok(Json(receipt(SessionState::KIND, accepted)))
}

/// `POST /sessions/{session_id}/log-updated?userId=`: announce new session log entries.
pub async fn session_log_updated(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(session_id): Path<String>,
    Query(notice): Query<SessionNoticeRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    let event = SessionLogUpdatedEvent::scoped(
        SessionLogUpdated::default(),
        Some(session_id),
        notice.user_id,
    );
    let accepted = state.publisher.publish(event)?;

    Ok(Json(receipt(SessionLogUpdated::KIND, accepted)))
}
