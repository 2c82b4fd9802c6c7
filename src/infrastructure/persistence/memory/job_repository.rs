use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{Job, JobId, JobStatus, TranscriptionResult};

#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<JobId, Job>>,
    results: RwLock<HashMap<JobId, TranscriptionResult>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "job {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: JobId,
        from: JobStatus,
        to: JobStatus,
        error_message: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(false);
        };
        if job.status != from {
            return Ok(false);
        }
        job.status = to;
        if let Some(message) = error_message {
            job.error_message = Some(message.to_string());
        }
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_priority(&self, id: JobId, priority: i64) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        job.priority = priority;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn set_warning(&self, id: JobId, warning: &str) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        job.warning = Some(warning.to_string());
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn save_result(
        &self,
        id: JobId,
        provider_id: &str,
        result: &TranscriptionResult,
    ) -> Result<(), RepositoryError> {
        {
            let mut jobs = self.jobs.write().await;
            let job = jobs
                .get_mut(&id)
                .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
            job.provider_id = Some(provider_id.to_string());
            job.updated_at = Utc::now();
        }
        self.results.write().await.insert(id, result.clone());
        Ok(())
    }

    async fn get_result(&self, id: JobId) -> Result<Option<TranscriptionResult>, RepositoryError> {
        Ok(self.results.read().await.get(&id).cloned())
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, RepositoryError> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }
}
