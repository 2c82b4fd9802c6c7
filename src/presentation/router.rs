use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    blob_handler, cancel_job_handler, health_handler, job_status_handler, reset_identity_handler,
    submit_job_handler, transcript_handler, upload_handler,
};
use crate::presentation::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = usize::try_from(state.settings.jobs.max_upload_bytes).unwrap_or(usize::MAX);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/v1/uploads",
            post(upload_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/jobs", post(submit_job_handler))
        .route(
            "/api/v1/jobs/{job_id}",
            get(job_status_handler).delete(cancel_job_handler),
        )
        .route("/api/v1/jobs/{job_id}/transcript", get(transcript_handler))
        .route(
            "/api/v1/admin/identities/{key}/reset",
            post(reset_identity_handler),
        )
        .route("/blobs/{*path}", get(blob_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
