use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::services::SubmitJob;
use crate::application::services::admission::QuotaRemaining;
use crate::domain::{JobId, JobOptions, OutputFormat, PublicStatus, SourceDescriptor};
use crate::presentation::state::AppState;

use super::caller::Caller;
use super::error::{ApiError, error_response};

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub source: SourceDescriptor,
    #[serde(default)]
    pub options: JobOptions,
    #[serde(default)]
    pub estimated_minutes: Option<f64>,
}

#[derive(Serialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
    pub status: PublicStatus,
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<QuotaRemaining>,
}

#[derive(Serialize)]
pub struct CancelJobResponse {
    pub cancelled: bool,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptQuery {
    #[serde(default)]
    pub format: Option<String>,
}

fn parse_job_id(raw: &str) -> Result<JobId, Response> {
    Uuid::parse_str(raw)
        .map(JobId::from_uuid)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, format!("Invalid job ID: {}", raw)))
}

#[tracing::instrument(skip(state, caller, request), fields(identity = %caller.identity, tier = %caller.tier))]
pub async fn submit_job_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<SubmitJobRequest>,
) -> Response {
    let submit = SubmitJob {
        identity: caller.identity,
        tier: caller.tier,
        source: request.source,
        options: request.options,
        estimated_minutes: request.estimated_minutes,
        signals: caller.signals,
        bot_verified: caller.bot_verified,
    };
    match state.job_service.submit_job(submit).await {
        Ok(submitted) => (
            StatusCode::ACCEPTED,
            Json(SubmitJobResponse {
                job_id: submitted.job_id,
                status: submitted.status,
                position: submitted.position,
                remaining: submitted.remaining,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::info!(error = %e, "Job submission rejected");
            ApiError(e).into_response()
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.job_service.job_status(job_id).await {
        Ok(poll) => (StatusCode::OK, Json(poll)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

#[tracing::instrument(skip(state, caller), fields(identity = %caller.identity))]
pub async fn cancel_job_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(job_id): Path<String>,
) -> Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.job_service.cancel_job(job_id, &caller.identity).await {
        Ok(cancelled) => (StatusCode::OK, Json(CancelJobResponse { cancelled })).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

#[tracing::instrument(skip(state))]
pub async fn transcript_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<TranscriptQuery>,
) -> Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let format = match query.format.as_deref().unwrap_or("txt").parse::<OutputFormat>() {
        Ok(format) => format,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };
    match state.job_service.transcript(job_id, format).await {
        Ok(rendered) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, rendered.content_type)],
            rendered.content,
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}
