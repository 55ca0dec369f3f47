use axum::{Json, extract::State, response::IntoResponse};
use wsnotify_sdk::objects::{
    Payload, ServerConfigurationChanged, ServerConfigurationChangedEvent,
};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, receipt};

/// `POST /config/changed`: broadcast `cb_config_changed` to every subscriber.
///
/// For configuration edited outside this server; a SIGHUP reload of this
/// server's own config publishes the same event.
pub async fn config_changed(
    state: State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, AdminApiError> {
    let accepted = state
        .publisher
        .publish(ServerConfigurationChangedEvent::default())?;

    Ok(Json(receipt(ServerConfigurationChanged::KIND, accepted)))
}
