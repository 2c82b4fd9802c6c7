use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::services::JobServiceError;
use crate::application::services::admission::{QuotaExceeded, QuotaRemaining, RateScope};

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exceeded: Option<QuotaExceeded>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<QuotaRemaining>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            scope: None,
            retry_after_secs: None,
            exceeded: None,
            remaining: None,
        }
    }
}

pub fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(error))).into_response()
}

/// Maps service errors onto the public status codes.
pub struct ApiError(pub JobServiceError);

impl From<JobServiceError> for ApiError {
    fn from(e: JobServiceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        match self.0 {
            JobServiceError::NotFound(_) => error_response(StatusCode::NOT_FOUND, message),
            JobServiceError::Invalid(_) => error_response(StatusCode::BAD_REQUEST, message),
            JobServiceError::RateLimited { scope, retry_after } => {
                // Round up so clients never retry early.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                let secs = secs.max(1);
                let body = ErrorResponse {
                    scope: Some(match scope {
                        RateScope::Minute => "minute",
                        RateScope::Day => "day",
                    }),
                    retry_after_secs: Some(secs),
                    ..ErrorResponse::new("rate limited")
                };
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            JobServiceError::QuotaExceeded {
                exceeded,
                remaining,
            } => {
                let body = ErrorResponse {
                    exceeded: Some(exceeded),
                    remaining: Some(remaining),
                    ..ErrorResponse::new("quota exceeded")
                };
                (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
            }
            JobServiceError::Blocked => error_response(StatusCode::FORBIDDEN, message),
            JobServiceError::NotReady(_) => error_response(StatusCode::CONFLICT, message),
            JobServiceError::UpstreamFailure(_) => error_response(StatusCode::BAD_GATEWAY, message),
            other => {
                tracing::error!(error = %other, "Request failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}
