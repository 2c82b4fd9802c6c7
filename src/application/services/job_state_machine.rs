use std::sync::Arc;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{JobId, JobStatus};

/// Guards every status change: only forward single-step edges or a move to
/// `Failed` from a non-terminal state are written, each as a
/// compare-and-set against the stored status.
pub struct JobStateMachine {
    repository: Arc<dyn JobRepository>,
}

impl JobStateMachine {
    pub fn new(repository: Arc<dyn JobRepository>) -> Self {
        Self { repository }
    }

    pub async fn current(&self, job_id: JobId) -> Result<JobStatus, JobStateError> {
        self.repository
            .get_by_id(job_id)
            .await?
            .map(|job| job.status)
            .ok_or(JobStateError::NotFound(job_id))
    }

    /// Moves the job from `from` to `to`.
    pub async fn transition(
        &self,
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<(), JobStateError> {
        if !from.can_transition_to(to) || to == JobStatus::Failed {
            return Err(JobStateError::InvalidTransition { from, to });
        }
        self.write(job_id, from, to, None).await
    }

    /// Advances the job one step from its stored state.
    pub async fn advance(&self, job_id: JobId) -> Result<JobStatus, JobStateError> {
        let from = self.current(job_id).await?;
        let to = from
            .next()
            .ok_or(JobStateError::InvalidTransition { from, to: from })?;
        self.transition(job_id, from, to).await?;
        Ok(to)
    }

    /// Marks a non-terminal job failed. Returns the state it failed from.
    pub async fn fail(&self, job_id: JobId, reason: &str) -> Result<JobStatus, JobStateError> {
        let from = self.current(job_id).await?;
        if from.is_terminal() {
            return Err(JobStateError::InvalidTransition {
                from,
                to: JobStatus::Failed,
            });
        }
        self.write(job_id, from, JobStatus::Failed, Some(reason))
            .await?;
        Ok(from)
    }

    async fn write(
        &self,
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), JobStateError> {
        let written = self
            .repository
            .update_status(job_id, from, to, error_message)
            .await?;
        if !written {
            return match self.repository.get_by_id(job_id).await? {
                None => Err(JobStateError::NotFound(job_id)),
                Some(job) => Err(JobStateError::Conflict {
                    expected: from,
                    actual: job.status,
                }),
            };
        }
        tracing::debug!(job_id = %job_id, from = %from, to = %to, "Job status transition");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobStateError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
    #[error("job status changed concurrently: expected {expected}, found {actual}")]
    Conflict { expected: JobStatus, actual: JobStatus },
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
}
