use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::BoxStream;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::ports::{
    BlobStore, BlobStoreError, JobRepository, PollResponse, RepositoryError, StatusSource,
    StatusSourceError, StoreError,
};
use crate::domain::{
    IdentityKey, Job, JobId, JobOptions, JobStatus, OutputFormat, PublicStatus,
    SourceDescriptor, SourceKind, StoragePath, Tier,
};

use super::admission::{
    AdmissionContext, AdmissionController, AdmissionError, ClientSignals, DenialReason,
    QuotaExceeded, QuotaRemaining, RateScope,
};
use super::audio_pipeline::AudioPipeline;
use super::job_state_machine::{JobStateError, JobStateMachine};
use super::priority_queue::PriorityQueue;
use super::transcript_formatter;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobServiceConfig {
    /// Quota reservation for sources whose length is unknown at submission.
    pub default_estimate_minutes: f64,
    pub max_upload_bytes: u64,
}

impl Default for JobServiceConfig {
    fn default() -> Self {
        Self {
            default_estimate_minutes: 10.0,
            max_upload_bytes: 500 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmitJob {
    pub identity: IdentityKey,
    pub tier: Tier,
    pub source: SourceDescriptor,
    pub options: JobOptions,
    /// Caller's own estimate of the source length.
    pub estimated_minutes: Option<f64>,
    pub signals: ClientSignals,
    pub bot_verified: bool,
}

#[derive(Debug, Clone)]
pub struct SubmittedJob {
    pub job_id: JobId,
    pub status: PublicStatus,
    pub position: Option<usize>,
    pub remaining: Option<QuotaRemaining>,
}

#[derive(Debug, Clone)]
pub struct RenderedTranscript {
    pub content: String,
    pub content_type: &'static str,
}

pub struct JobService {
    repository: Arc<dyn JobRepository>,
    admission: Arc<AdmissionController>,
    queue: Arc<PriorityQueue>,
    audio: Arc<AudioPipeline>,
    blob_store: Arc<dyn BlobStore>,
    state: JobStateMachine,
    config: JobServiceConfig,
}

impl JobService {
    pub fn new(
        repository: Arc<dyn JobRepository>,
        admission: Arc<AdmissionController>,
        queue: Arc<PriorityQueue>,
        audio: Arc<AudioPipeline>,
        blob_store: Arc<dyn BlobStore>,
        config: JobServiceConfig,
    ) -> Self {
        Self {
            state: JobStateMachine::new(repository.clone()),
            repository,
            admission,
            queue,
            audio,
            blob_store,
            config,
        }
    }

    pub async fn queue_depth(&self) -> Result<usize, JobServiceError> {
        Ok(self.queue.len().await?)
    }

    /// Streams an upload into blob storage and returns the reference to use
    /// as a `stored_file` source.
    #[tracing::instrument(skip(self, stream))]
    pub async fn upload(
        &self,
        filename: &str,
        stream: BoxStream<'_, Result<Bytes, io::Error>>,
        content_length: Option<u64>,
    ) -> Result<StoragePath, JobServiceError> {
        if content_length.is_some_and(|len| len > self.config.max_upload_bytes) {
            return Err(JobServiceError::Invalid(format!(
                "upload exceeds {} bytes",
                self.config.max_upload_bytes
            )));
        }
        let path = StoragePath::upload(Uuid::new_v4(), filename);
        let size = self.blob_store.store(&path, stream, content_length).await?;
        tracing::info!(path = %path, bytes = size, "Upload stored");
        Ok(path)
    }

    #[tracing::instrument(
        skip(self, request),
        fields(identity = %request.identity, tier = %request.tier, source_kind = %request.source.kind)
    )]
    pub async fn submit_job(&self, request: SubmitJob) -> Result<SubmittedJob, JobServiceError> {
        request.source.validate().map_err(JobServiceError::Invalid)?;
        validate_options(&request.options)?;

        let requested_minutes = self.estimate_minutes(&request).await;
        let context = AdmissionContext {
            signals: request.signals.clone(),
            target: Some(request.source.reference.clone()),
            requested_minutes,
            accuracy: request.options.accuracy,
            bot_verified: request.bot_verified,
        };
        let now = Utc::now();
        let decision = self
            .admission
            .admit(&request.identity, request.tier, &context, now)
            .await?;
        if let Some(reason) = decision.reason {
            return Err(match reason {
                DenialReason::Blocked | DenialReason::AbuseDetected => JobServiceError::Blocked,
                DenialReason::RateLimited(scope) => JobServiceError::RateLimited {
                    scope,
                    retry_after: decision.retry_after.unwrap_or(Duration::from_secs(1)),
                },
                DenialReason::QuotaExceeded(exceeded) => JobServiceError::QuotaExceeded {
                    exceeded,
                    remaining: decision.remaining.unwrap_or_default(),
                },
            });
        }

        let mut job = Job::new(
            request.identity,
            request.tier,
            request.source,
            request.options,
            requested_minutes,
        );
        let entry = self.queue.entry_for(&job, now);
        job.priority = entry.base_score;
        self.repository.create(&job).await?;

        self.state
            .transition(job.id, JobStatus::Submitted, JobStatus::Queued)
            .await?;
        self.queue.enqueue(entry).await?;
        let position = self.queue.position_of(job.id, Utc::now()).await?;

        tracing::info!(
            job_id = %job.id,
            priority = job.priority,
            requested_minutes,
            position = ?position,
            "Job submitted"
        );
        Ok(SubmittedJob {
            job_id: job.id,
            status: JobStatus::Queued.public(),
            position,
            remaining: decision.remaining,
        })
    }

    pub async fn job_status(&self, job_id: JobId) -> Result<PollResponse, JobServiceError> {
        let job = self
            .repository
            .get_by_id(job_id)
            .await?
            .ok_or(JobServiceError::NotFound(job_id))?;
        let position = if job.status == JobStatus::Queued {
            self.queue.position_of(job_id, Utc::now()).await?
        } else {
            None
        };
        Ok(PollResponse {
            job_id,
            status: job.status.public(),
            progress: job.status.progress(),
            warning: job.warning,
            error: job.error_message,
            position,
        })
    }

    /// Cancels a still-pending job owned by `requester`. Returns `false` when
    /// the job is no longer pending or belongs to someone else.
    #[tracing::instrument(skip(self), fields(job_id = %job_id, requester = %requester))]
    pub async fn cancel_job(
        &self,
        job_id: JobId,
        requester: &IdentityKey,
    ) -> Result<bool, JobServiceError> {
        let job = self
            .repository
            .get_by_id(job_id)
            .await?
            .ok_or(JobServiceError::NotFound(job_id))?;
        if job.status != JobStatus::Queued || &job.owner != requester {
            return Ok(false);
        }
        if !self.queue.cancel(job_id, requester).await? {
            return Ok(false);
        }
        match self.state.fail(job_id, "cancelled").await {
            Ok(_) => {
                tracing::info!("Job cancelled");
                Ok(true)
            }
            // The worker may have taken the job between the two steps.
            Err(JobStateError::Conflict { .. } | JobStateError::InvalidTransition { .. }) => {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn transcript(
        &self,
        job_id: JobId,
        format: OutputFormat,
    ) -> Result<RenderedTranscript, JobServiceError> {
        let job = self
            .repository
            .get_by_id(job_id)
            .await?
            .ok_or(JobServiceError::NotFound(job_id))?;
        match job.status {
            JobStatus::Completed => {}
            JobStatus::Failed => {
                return Err(JobServiceError::UpstreamFailure(
                    job.error_message.unwrap_or_else(|| "job failed".to_string()),
                ));
            }
            _ => return Err(JobServiceError::NotReady(job_id)),
        }

        let path = StoragePath::transcript(&job_id, format.extension());
        match self.blob_store.fetch(&path).await {
            Ok(bytes) => {
                let content = String::from_utf8(bytes)
                    .map_err(|e| JobServiceError::Render(e.to_string()))?;
                return Ok(RenderedTranscript {
                    content,
                    content_type: format.content_type(),
                });
            }
            Err(BlobStoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        // Formats not requested at submission are rendered on demand.
        let result = self
            .repository
            .get_result(job_id)
            .await?
            .ok_or(JobServiceError::NotReady(job_id))?;
        let content = transcript_formatter::render(&result, format)
            .map_err(|e| JobServiceError::Render(e.to_string()))?;
        Ok(RenderedTranscript {
            content,
            content_type: format.content_type(),
        })
    }

    /// Clears abuse state for an identity, lifting any block.
    pub async fn reset_identity(&self, identity: &IdentityKey) -> Result<bool, JobServiceError> {
        let reset = self
            .admission
            .abuse_detector()
            .reset(identity)
            .await
            .map_err(AdmissionError::from)?;
        tracing::info!(identity = %identity, reset, "Abuse state reset");
        Ok(reset)
    }

    async fn estimate_minutes(&self, request: &SubmitJob) -> f64 {
        let mut seconds = match request.estimated_minutes {
            Some(minutes) if minutes.is_finite() && minutes > 0.0 => minutes * 60.0,
            _ => match request.source.kind {
                SourceKind::StoredFile => self
                    .audio
                    .stored_duration(&request.source.reference)
                    .await
                    .unwrap_or(self.config.default_estimate_minutes * 60.0),
                SourceKind::RemoteUrl | SourceKind::Platform => {
                    self.config.default_estimate_minutes * 60.0
                }
            },
        };
        seconds = (seconds - f64::from(request.options.offset_seconds)).max(0.0);
        let preview_max = self.audio.config().preview_max_seconds;
        if let Some(cap) = clip_limit(request.tier, &request.options, preview_max) {
            seconds = seconds.min(f64::from(cap));
        }
        seconds / 60.0
    }
}

/// The clip length a job runs with: the caller's `max_seconds`, tightened
/// to the preview limit for the free tier.
pub fn clip_limit(tier: Tier, options: &JobOptions, preview_max_seconds: u32) -> Option<u32> {
    match (tier, options.max_seconds) {
        (Tier::Free, Some(requested)) => Some(requested.min(preview_max_seconds)),
        (Tier::Free, None) => Some(preview_max_seconds),
        (_, requested) => requested,
    }
}

fn validate_options(options: &JobOptions) -> Result<(), JobServiceError> {
    if options.formats.is_empty() {
        return Err(JobServiceError::Invalid(
            "at least one output format is required".to_string(),
        ));
    }
    if options.max_seconds == Some(0) {
        return Err(JobServiceError::Invalid(
            "max_seconds must be positive".to_string(),
        ));
    }
    if let Some(language) = &options.language
        && (language.is_empty() || language.len() > 16)
    {
        return Err(JobServiceError::Invalid(format!(
            "invalid language hint: {:?}",
            language
        )));
    }
    Ok(())
}

#[async_trait]
impl StatusSource for JobService {
    async fn poll(&self, job_id: JobId) -> Result<PollResponse, StatusSourceError> {
        self.job_status(job_id).await.map_err(|e| match e {
            JobServiceError::NotFound(id) => StatusSourceError::NotFound(id),
            other => StatusSourceError::Unavailable(other.to_string()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobServiceError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited {
        scope: RateScope,
        retry_after: Duration,
    },
    #[error("quota exceeded: {exceeded:?}")]
    QuotaExceeded {
        exceeded: QuotaExceeded,
        remaining: QuotaRemaining,
    },
    #[error("identity blocked")]
    Blocked,
    #[error("job {0} has no transcript yet")]
    NotReady(JobId),
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
    #[error("admission: {0}")]
    Admission(#[from] AdmissionError),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("job state: {0}")]
    State(#[from] JobStateError),
    #[error("queue: {0}")]
    Queue(#[from] StoreError),
    #[error("storage: {0}")]
    Storage(#[from] BlobStoreError),
    #[error("render: {0}")]
    Render(String),
}
