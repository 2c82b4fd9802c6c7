use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;

use crate::application::ports::BlobStoreError;
use crate::domain::{StoragePath, content_type_for_extension};
use crate::presentation::state::AppState;

use super::error::error_response;

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// Serves blobs behind expiring signed URLs so external workers and
/// providers can fetch job audio.
#[tracing::instrument(skip(state, query))]
pub async fn blob_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Response {
    if !state
        .url_signer
        .verify(&path, query.expires, &query.signature, Utc::now())
    {
        return error_response(StatusCode::FORBIDDEN, "invalid or expired signature");
    }
    let storage_path = StoragePath::from_raw(path.clone());
    match state.blob_store.fetch(&storage_path).await {
        Ok(bytes) => {
            let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type_for_extension(extension))],
                bytes,
            )
                .into_response()
        }
        Err(BlobStoreError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, "blob not found"),
        Err(e) => {
            tracing::error!(error = %e, "Blob fetch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "blob fetch failed")
        }
    }
}
