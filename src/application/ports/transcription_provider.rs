use async_trait::async_trait;

use crate::domain::{AccuracyMode, AudioAsset, TranscriptionResult};

pub struct TranscriptionRequest<'a> {
    pub asset: &'a AudioAsset,
    pub audio: &'a [u8],
    pub language: Option<&'a str>,
    pub accuracy: AccuracyMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderJobRef {
    pub provider_id: String,
    pub external_id: String,
}

#[derive(Debug)]
pub enum ProviderSubmission {
    /// Synchronous providers answer in the submit call.
    Completed(TranscriptionResult),
    /// Asynchronous providers hand back a reference to poll.
    Accepted(ProviderJobRef),
}

#[derive(Debug)]
pub enum ProviderStatus {
    Pending,
    Running { progress: Option<u8> },
    Completed(TranscriptionResult),
    Failed(String),
}

/// Provider-agnostic phase used to interpret a provider's own status words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPhase {
    Pending,
    Running,
    Completed,
    Failed,
}

pub fn map_provider_status(raw: &str) -> Option<ProviderPhase> {
    match raw.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
        "queued" | "pending" | "waiting" | "submitted" | "not_started" => {
            Some(ProviderPhase::Pending)
        }
        "processing" | "running" | "in_progress" | "transcribing" | "started" => {
            Some(ProviderPhase::Running)
        }
        "completed" | "succeeded" | "success" | "done" | "finished" => {
            Some(ProviderPhase::Completed)
        }
        "failed" | "error" | "errored" | "cancelled" | "canceled" | "rejected" => {
            Some(ProviderPhase::Failed)
        }
        _ => None,
    }
}

#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn submit(
        &self,
        request: &TranscriptionRequest<'_>,
    ) -> Result<ProviderSubmission, ProviderError>;

    async fn status(&self, job_ref: &ProviderJobRef) -> Result<ProviderStatus, ProviderError> {
        Err(ProviderError::PollingUnsupported(job_ref.provider_id.clone()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
    #[error("provider timed out after {0}s")]
    Timeout(u64),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("provider rejected job: {0}")]
    Rejected(String),
    #[error("gave up polling after {0} attempts")]
    PollingExhausted(u32),
    #[error("provider {0} does not support polling")]
    PollingUnsupported(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}
