use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued_jobs: Option<usize>,
}

/// Liveness plus a queue read, so a broken queue backend reports degraded.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.job_service.queue_depth().await {
        Ok(depth) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                version: env!("CARGO_PKG_VERSION"),
                queued_jobs: Some(depth),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not read the queue");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    version: env!("CARGO_PKG_VERSION"),
                    queued_jobs: None,
                }),
            )
        }
    }
}
