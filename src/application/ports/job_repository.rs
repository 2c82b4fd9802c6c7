use crate::domain::{Job, JobId, JobStatus, TranscriptionResult};
use async_trait::async_trait;

use super::RepositoryError;

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;

    /// Moves the job from `from` to `to`. Returns `false` without writing
    /// when the stored status is no longer `from`.
    async fn update_status(
        &self,
        id: JobId,
        from: JobStatus,
        to: JobStatus,
        error_message: Option<&str>,
    ) -> Result<bool, RepositoryError>;

    async fn set_priority(&self, id: JobId, priority: i64) -> Result<(), RepositoryError>;

    async fn set_warning(&self, id: JobId, warning: &str) -> Result<(), RepositoryError>;

    async fn save_result(
        &self,
        id: JobId,
        provider_id: &str,
        result: &TranscriptionResult,
    ) -> Result<(), RepositoryError>;

    async fn get_result(&self, id: JobId) -> Result<Option<TranscriptionResult>, RepositoryError>;

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, RepositoryError>;
}
