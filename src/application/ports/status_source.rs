use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{JobId, PublicStatus};

/// What a caller sees when polling a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub job_id: JobId,
    pub status: PublicStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 1-based queue position while the job is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn poll(&self, job_id: JobId) -> Result<PollResponse, StatusSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StatusSourceError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("status unavailable: {0}")]
    Unavailable(String),
}
