use std::io;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use serde::Serialize;

use crate::application::services::JobServiceError;
use crate::presentation::state::AppState;

use super::error::{ApiError, error_response};

#[derive(Serialize)]
pub struct UploadResponse {
    /// Use as the reference of a `stored_file` source.
    pub reference: String,
}

#[tracing::instrument(skip(state, multipart))]
pub async fn upload_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let field = match multipart.next_field().await {
        Ok(Some(f)) => f,
        Ok(None) => {
            tracing::warn!("Upload request with no file");
            return error_response(StatusCode::BAD_REQUEST, "No file uploaded");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to read multipart");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read multipart: {}", e),
            );
        }
    };

    let filename = field.file_name().unwrap_or("upload").to_string();
    tracing::debug!(filename = %filename, content_type = ?field.content_type(), "Receiving upload");

    let stream = field.map_err(|e| io::Error::other(e.to_string()));
    match state
        .job_service
        .upload(&filename, Box::pin(stream), None)
        .await
    {
        Ok(path) => (
            StatusCode::CREATED,
            Json(UploadResponse {
                reference: path.to_string(),
            }),
        )
            .into_response(),
        Err(JobServiceError::Storage(e)) => {
            tracing::error!(error = %e, "Upload could not be stored");
            error_response(StatusCode::BAD_REQUEST, format!("Upload failed: {}", e))
        }
        Err(e) => ApiError(e).into_response(),
    }
}
