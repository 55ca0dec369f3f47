//! Custom Axum extractors for request authentication.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use wsnotify_sdk::objects::admin::ADMIN_AUTHORIZATION_HEADER;

use crate::state::AppState;

/// An Axum extractor that checks the `Wsnotify-Admin-Authorization` header
/// against the hashed admin secret.
///
/// # Header format
///
/// ```text
/// Wsnotify-Admin-Authorization: {plaintext_admin_secret}
/// ```
pub struct AdminAuth;

/// Errors returned by the [`AdminAuth`] extractor.
#[derive(Debug)]
pub enum AdminAuthError {
    MissingHeader,
    InvalidHeader,
    WrongSecret,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminAuthError::MissingHeader => (
                StatusCode::UNAUTHORIZED,
                "missing Wsnotify-Admin-Authorization header",
            ),
            AdminAuthError::InvalidHeader => (StatusCode::BAD_REQUEST, "invalid header format"),
            AdminAuthError::WrongSecret => (StatusCode::UNAUTHORIZED, "invalid admin secret"),
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(ADMIN_AUTHORIZATION_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidHeader)?;

        let config = state.config().await;
        if !config.admin.verify_secret(secret) {
            drop(config);
            tracing::warn!("Admin API: rejected request with invalid secret");
            return Err(AdminAuthError::WrongSecret);
        }

        Ok(AdminAuth)
    }
}
