use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::application::ports::{
    BlobStore, BlobStoreError, JobRepository, RepositoryError, StoreError, TranscriptionRequest,
};
use crate::domain::{AudioAsset, Job, JobStatus, QueueEntry, StoragePath};

use super::admission::{AdmissionController, QuotaExceeded};
use super::audio_pipeline::{AcquisitionError, AudioPipeline, ClipStage};
use super::job_service::clip_limit;
use super::job_state_machine::{JobStateError, JobStateMachine};
use super::priority_queue::PriorityQueue;
use super::provider_dispatcher::{DispatchOutcome, ProviderDispatcher, describe_failures};
use super::refinement::RefinementEngine;
use super::tier_slots::TierSlots;
use super::transcript_formatter;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Jobs processed at once across all tiers.
    pub concurrency: usize,
    /// Upper bound on the wait between queue checks when idle.
    pub idle_poll_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            idle_poll_ms: 1_000,
        }
    }
}

/// Drains the priority queue and runs each job through acquisition,
/// dispatch, refinement and output rendering.
pub struct TranscriptionWorker {
    queue: Arc<PriorityQueue>,
    slots: Arc<TierSlots>,
    repository: Arc<dyn JobRepository>,
    admission: Arc<AdmissionController>,
    state: JobStateMachine,
    audio: Arc<AudioPipeline>,
    dispatcher: Arc<ProviderDispatcher>,
    refinement: Arc<RefinementEngine>,
    blob_store: Arc<dyn BlobStore>,
    config: WorkerConfig,
}

impl TranscriptionWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<PriorityQueue>,
        slots: Arc<TierSlots>,
        repository: Arc<dyn JobRepository>,
        admission: Arc<AdmissionController>,
        audio: Arc<AudioPipeline>,
        dispatcher: Arc<ProviderDispatcher>,
        refinement: Arc<RefinementEngine>,
        blob_store: Arc<dyn BlobStore>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            slots,
            state: JobStateMachine::new(repository.clone()),
            repository,
            admission,
            audio,
            dispatcher,
            refinement,
            blob_store,
            config,
        }
    }

    /// Re-queues persisted `queued` jobs and fails jobs a previous process
    /// left mid-pipeline. The queue itself is not durable.
    pub async fn recover(&self) -> Result<usize, WorkerError> {
        let mut requeued = 0;
        for job in self.repository.list_by_status(JobStatus::Queued).await? {
            let entry = self.queue.entry_for(&job, job.created_at);
            self.queue.enqueue(entry).await?;
            requeued += 1;
        }
        for status in [
            JobStatus::Submitted,
            JobStatus::Downloading,
            JobStatus::Transcribing,
            JobStatus::Refining,
        ] {
            for job in self.repository.list_by_status(status).await? {
                tracing::warn!(job_id = %job.id, stage = %status, "Failing job interrupted by restart");
                if let Err(e) = self.state.fail(job.id, "interrupted by restart").await {
                    tracing::warn!(job_id = %job.id, error = %e, "Could not fail interrupted job");
                }
            }
        }
        if requeued > 0 {
            tracing::info!(requeued, "Recovered queued jobs");
        }
        Ok(requeued)
    }

    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!(concurrency = self.config.concurrency, "Transcription worker started");
        let global = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let idle = Duration::from_millis(self.config.idle_poll_ms);

        loop {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&global).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let next = self
                .queue
                .dequeue_reserving(Utc::now(), |tier| self.slots.try_acquire(tier))
                .await;
            let (entry, tier_permit) = match next {
                Ok(Some(next)) => next,
                Ok(None) => {
                    drop(permit);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = self.queue.wait_for_work() => {}
                        _ = tokio::time::sleep(idle) => {}
                    }
                    continue;
                }
                Err(e) => {
                    drop(permit);
                    tracing::error!(error = %e, "Queue dequeue failed");
                    tokio::time::sleep(idle).await;
                    continue;
                }
            };

            let worker = Arc::clone(&self);
            tokio::spawn(async move {
                worker.process_entry(entry).await;
                drop(tier_permit);
                drop(permit);
                // Entries of the freed tier may be waiting.
                worker.queue.wake();
            });
        }
        tracing::info!("Transcription worker stopped");
    }

    pub async fn process_entry(&self, entry: QueueEntry) {
        let span = tracing::info_span!(
            "transcription_job",
            job_id = %entry.job_id,
            tier = %entry.tier,
            kind = %entry.kind,
        );
        self.run_entry(entry).instrument(span).await;
    }

    async fn run_entry(&self, entry: QueueEntry) {
        let job = match self.repository.get_by_id(entry.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!("Dequeued job no longer exists");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load dequeued job");
                return;
            }
        };
        if job.status != JobStatus::Queued {
            tracing::debug!(status = %job.status, "Skipping job that left the queue state");
            return;
        }

        match self.process_job(&job).await {
            Ok(()) => tracing::info!("Transcription job completed"),
            Err(e) => {
                tracing::error!(
                    job_id = %job.id,
                    source_kind = %job.source.kind,
                    stage = e.stage(),
                    error = %e,
                    "Transcription job failed"
                );
                if let Err(state_err) = self.state.fail(job.id, &e.to_string()).await {
                    tracing::warn!(error = %state_err, "Could not mark job failed");
                }
            }
        }
    }

    async fn process_job(&self, job: &Job) -> Result<(), WorkerError> {
        self.state
            .transition(job.id, JobStatus::Queued, JobStatus::Downloading)
            .await?;

        let (asset, mut warnings) = self.acquire_audio(job).await?;
        let outcome = self.transcribe_and_refine(job, &asset, &mut warnings).await;
        self.audio.release(&asset).await;
        outcome?;

        if !warnings.is_empty() {
            self.repository
                .set_warning(job.id, &warnings.join("; "))
                .await?;
        }
        self.state
            .transition(job.id, JobStatus::Refining, JobStatus::Completed)
            .await?;
        Ok(())
    }

    async fn acquire_audio(&self, job: &Job) -> Result<(AudioAsset, Vec<String>), WorkerError> {
        let asset = self.audio.resolve_audio(job.id, &job.source).await?;
        let mut warnings = Vec::new();

        let mut limit = clip_limit(job.tier, &job.options, self.audio.config().preview_max_seconds);
        match self.settle_quota(job, asset.duration_seconds, limit).await {
            Ok(Some(reserved)) => limit = Some(limit.map_or(reserved, |l| l.min(reserved))),
            Ok(None) => {}
            Err(e) => {
                self.audio.release(&asset).await;
                return Err(e);
            }
        }
        if limit.is_none() && job.options.offset_seconds == 0 {
            return Ok((asset, warnings));
        }
        let target = limit.unwrap_or(u32::MAX);
        let clipped = match self.audio.clip(asset.clone(), target, job.options.offset_seconds).await {
            Ok(clipped) => clipped,
            Err(e) => {
                self.audio.release(&asset).await;
                return Err(e.into());
            }
        };
        if clipped.stage == ClipStage::Passthrough {
            warnings.push("audio could not be clipped and was transcribed in full".to_string());
        }
        Ok((clipped.asset, warnings))
    }

    /// Charges audio beyond the admission reservation once its length is
    /// known. When the length is unknown on a metered tier, returns the
    /// reserved seconds as a clip cap instead.
    async fn settle_quota(
        &self,
        job: &Job,
        duration_seconds: Option<f64>,
        limit: Option<u32>,
    ) -> Result<Option<u32>, WorkerError> {
        let quota = self.admission.quota_tracker();
        let reserved_seconds = job.requested_minutes.max(0.0) * 60.0;
        let Some(duration) = duration_seconds else {
            if quota.is_unlimited(job.tier) {
                return Ok(None);
            }
            return Ok(Some((reserved_seconds.ceil() as u32).max(1)));
        };

        let mut billable = (duration - f64::from(job.options.offset_seconds)).max(0.0);
        if let Some(limit) = limit {
            billable = billable.min(f64::from(limit));
        }
        if billable - reserved_seconds < 1.0 {
            return Ok(None);
        }
        let extra_minutes = (billable - reserved_seconds) / 60.0;
        if let Some(exceeded) = quota
            .settle(&job.owner, job.tier, extra_minutes, job.options.accuracy, Utc::now())
            .await?
        {
            return Err(WorkerError::QuotaExceeded {
                exceeded,
                audio_minutes: billable / 60.0,
                reserved_minutes: job.requested_minutes,
            });
        }
        tracing::info!(extra_minutes, "Charged audio beyond the reserved minutes");
        Ok(None)
    }

    async fn transcribe_and_refine(
        &self,
        job: &Job,
        asset: &AudioAsset,
        warnings: &mut Vec<String>,
    ) -> Result<(), WorkerError> {
        self.state
            .transition(job.id, JobStatus::Downloading, JobStatus::Transcribing)
            .await?;
        let audio = self.audio.load(asset).await?;
        let request = TranscriptionRequest {
            asset,
            audio: &audio,
            language: job.options.language.as_deref(),
            accuracy: job.options.accuracy,
        };
        let (provider_id, mut result) = match self.dispatcher.dispatch(&request).await {
            DispatchOutcome::Success {
                provider_id,
                result,
            } => (provider_id, result),
            DispatchOutcome::AllFailed { failures } => {
                return Err(WorkerError::AllProvidersFailed(describe_failures(&failures)));
            }
        };
        tracing::info!(provider = %provider_id, segments = result.segments.len(), "Transcription received");

        self.state
            .transition(job.id, JobStatus::Transcribing, JobStatus::Refining)
            .await?;
        warnings.extend(self.refinement.refine_result(&mut result).await);

        self.repository
            .save_result(job.id, &provider_id, &result)
            .await?;
        for format in &job.options.formats {
            let rendered = transcript_formatter::render(&result, *format)
                .map_err(|e| WorkerError::Render(e.to_string()))?;
            let path = StoragePath::transcript(&job.id, format.extension());
            self.blob_store.put(&path, Bytes::from(rendered)).await?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("audio acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error(
        "quota exceeded: {exceeded} ({audio_minutes:.1} min of audio, {reserved_minutes:.1} reserved)"
    )]
    QuotaExceeded {
        exceeded: QuotaExceeded,
        audio_minutes: f64,
        reserved_minutes: f64,
    },
    #[error("all providers failed: {0}")]
    AllProvidersFailed(String),
    #[error("job state: {0}")]
    State(#[from] JobStateError),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("queue: {0}")]
    Queue(#[from] StoreError),
    #[error("storage: {0}")]
    Storage(#[from] BlobStoreError),
    #[error("render: {0}")]
    Render(String),
}

impl WorkerError {
    pub fn stage(&self) -> &'static str {
        match self {
            WorkerError::Acquisition(_) | WorkerError::QuotaExceeded { .. } => "downloading",
            WorkerError::AllProvidersFailed(_) => "transcribing",
            WorkerError::Storage(_) | WorkerError::Render(_) => "output",
            WorkerError::State(_) | WorkerError::Repository(_) | WorkerError::Queue(_) => "state",
        }
    }
}
