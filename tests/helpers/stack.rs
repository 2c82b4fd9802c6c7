use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use scribeline::application::ports::{
    ClipWorker, LocalTranscoder, MediaFetcher, TranscriptionProvider,
};
use scribeline::application::services::admission::{
    AbuseDetector, AbusePolicy, AdmissionController, ClientSignals, QuotaPolicy, QuotaTracker,
    RateLimitPolicy, RateLimiter,
};
use scribeline::application::services::refinement::{RefinementConfig, RefinementEngine};
use scribeline::application::services::{
    AudioPipeline, AudioPipelineConfig, DispatchConfig, JobService, JobServiceConfig,
    PriorityPolicy, PriorityQueue, ProviderDispatcher, SubmitJob, TierConcurrency, TierSlots,
    TranscriptionWorker, WorkerConfig,
};
use scribeline::domain::{IdentityKey, JobOptions, SourceDescriptor, SourceKind, Tier};
use scribeline::infrastructure::persistence::{
    InMemoryAbuseStore, InMemoryCounterStore, InMemoryJobRepository, InMemoryQueueStore,
    InMemoryQuotaRepository,
};
use scribeline::infrastructure::storage::ObjectBlobStore;
use scribeline::presentation::{AppState, Settings};

use super::fakes::{FixedProbe, StaticFetcher, memory_blob_store};

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
}

pub fn browser_signals() -> ClientSignals {
    ClientSignals {
        ip: Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7))),
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0".to_string(),
        accept_language: "en-US".to_string(),
    }
}

pub fn account(name: &str) -> IdentityKey {
    IdentityKey::Account(name.to_string())
}

pub fn submit_request(identity: IdentityKey, tier: Tier, source: SourceDescriptor) -> SubmitJob {
    SubmitJob {
        identity,
        tier,
        source,
        options: JobOptions::default(),
        estimated_minutes: Some(3.0),
        signals: browser_signals(),
        bot_verified: true,
    }
}

pub fn remote_source(url: &str) -> SourceDescriptor {
    SourceDescriptor::new(SourceKind::RemoteUrl, url)
}

pub struct StackOptions {
    pub rate: RateLimitPolicy,
    pub quota: QuotaPolicy,
    pub abuse: AbusePolicy,
    pub priority: PriorityPolicy,
    pub audio: AudioPipelineConfig,
    pub probe_seconds: Option<f64>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub transcoder: Option<Arc<dyn LocalTranscoder>>,
    pub clip_worker: Option<Arc<dyn ClipWorker>>,
    pub jobs: JobServiceConfig,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            rate: RateLimitPolicy::default(),
            quota: QuotaPolicy::default(),
            abuse: AbusePolicy::default(),
            priority: PriorityPolicy::default(),
            audio: AudioPipelineConfig::default(),
            probe_seconds: Some(120.0),
            fetcher: Arc::new(StaticFetcher::new(b"RIFF-test-audio", Some("audio/wav"))),
            transcoder: None,
            clip_worker: None,
            jobs: JobServiceConfig::default(),
        }
    }
}

/// In-memory wiring of every service the HTTP layer and worker use.
pub struct TestStack {
    pub repository: Arc<InMemoryJobRepository>,
    pub quota_repository: Arc<InMemoryQuotaRepository>,
    pub blob_store: Arc<ObjectBlobStore>,
    pub admission: Arc<AdmissionController>,
    pub queue: Arc<PriorityQueue>,
    pub audio: Arc<AudioPipeline>,
    pub job_service: Arc<JobService>,
}

impl TestStack {
    pub fn new() -> Self {
        Self::with_options(StackOptions::default())
    }

    pub fn with_options(options: StackOptions) -> Self {
        let repository = Arc::new(InMemoryJobRepository::new());
        let quota_repository = Arc::new(InMemoryQuotaRepository::new());
        let blob_store = memory_blob_store();

        let admission = Arc::new(AdmissionController::new(
            RateLimiter::new(Arc::new(InMemoryCounterStore::new()), options.rate),
            QuotaTracker::new(quota_repository.clone(), options.quota),
            AbuseDetector::new(Arc::new(InMemoryAbuseStore::new()), options.abuse),
        ));
        let queue = Arc::new(PriorityQueue::new(
            Arc::new(InMemoryQueueStore::new()),
            options.priority,
        ));

        let mut audio = AudioPipeline::new(
            blob_store.clone(),
            options.fetcher,
            Arc::new(FixedProbe(options.probe_seconds)),
            options.audio,
        );
        if let Some(transcoder) = options.transcoder {
            audio = audio.with_transcoder(transcoder);
        }
        if let Some(clip_worker) = options.clip_worker {
            audio = audio.with_clip_worker(clip_worker);
        }
        let audio = Arc::new(audio);

        let job_service = Arc::new(JobService::new(
            repository.clone(),
            admission.clone(),
            queue.clone(),
            audio.clone(),
            blob_store.clone(),
            options.jobs,
        ));

        Self {
            repository,
            quota_repository,
            blob_store,
            admission,
            queue,
            audio,
            job_service,
        }
    }

    pub fn worker(
        &self,
        providers: Vec<Arc<dyn TranscriptionProvider>>,
        dispatch: DispatchConfig,
        refinement: RefinementEngine,
    ) -> TranscriptionWorker {
        self.worker_with_slots(
            providers,
            dispatch,
            refinement,
            Arc::new(TierSlots::new(&TierConcurrency::default())),
        )
    }

    pub fn worker_with_slots(
        &self,
        providers: Vec<Arc<dyn TranscriptionProvider>>,
        dispatch: DispatchConfig,
        refinement: RefinementEngine,
        slots: Arc<TierSlots>,
    ) -> TranscriptionWorker {
        TranscriptionWorker::new(
            self.queue.clone(),
            slots,
            self.repository.clone(),
            self.admission.clone(),
            self.audio.clone(),
            Arc::new(ProviderDispatcher::new(providers, dispatch)),
            Arc::new(refinement),
            self.blob_store.clone(),
            WorkerConfig::default(),
        )
    }

    pub fn default_refinement() -> RefinementEngine {
        RefinementEngine::from_config(&RefinementConfig::default(), None).unwrap()
    }

    pub fn app_state(&self, settings: Settings) -> AppState {
        AppState {
            job_service: self.job_service.clone(),
            blob_store: self.blob_store.clone(),
            url_signer: Arc::new(self.blob_store.signer().clone()),
            settings: Arc::new(settings),
        }
    }
}
