use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::IdentityKey;
use crate::presentation::state::AppState;

use super::error::{ApiError, error_response};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Serialize)]
pub struct ResetResponse {
    pub identity: String,
    pub reset: bool,
}

/// `key` is an identity storage key such as `acct:42` or `fp:<hash>`.
#[tracing::instrument(skip(state, headers))]
pub async fn reset_identity_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Response {
    if let Some(expected) = state.settings.server.admin_token.as_deref() {
        let presented = headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if presented != expected {
            return error_response(StatusCode::UNAUTHORIZED, "admin token required");
        }
    }
    let Some(identity) = IdentityKey::parse_storage_key(&key) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid identity key: {}", key),
        );
    };
    match state.job_service.reset_identity(&identity).await {
        Ok(reset) => (
            StatusCode::OK,
            Json(ResetResponse {
                identity: identity.storage_key(),
                reset,
            }),
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}
