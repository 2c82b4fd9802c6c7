mod abuse_store;
mod audio_clipper;
mod audio_probe;
mod blob_store;
mod counter_store;
mod job_repository;
mod llm_client;
mod media_source;
mod queue_store;
mod quota_repository;
mod repository_error;
mod status_source;
mod store_error;
mod transcription_provider;

pub use abuse_store::{AbuseRecord, AbuseSignal, AbuseStore, Observation, SignalHit};
pub use audio_clipper::{
    CLIP_CHANNELS, CLIP_SAMPLE_RATE, ClipError, ClipParams, ClipWorker, LocalTranscoder,
};
pub use audio_probe::{AudioProbe, ProbeError};
pub use blob_store::{BlobStore, BlobStoreError};
pub use counter_store::CounterStore;
pub use job_repository::JobRepository;
pub use llm_client::{LlmClient, LlmClientError};
pub use media_source::{FetchedMedia, MediaFetcher, PlatformResolver, ResolveError};
pub use queue_store::QueueStore;
pub use quota_repository::{QuotaRepository, UsageDelta, UsageSnapshot};
pub use repository_error::RepositoryError;
pub use status_source::{PollResponse, StatusSource, StatusSourceError};
pub use store_error::StoreError;
pub use transcription_provider::{
    ProviderError, ProviderJobRef, ProviderPhase, ProviderStatus, ProviderSubmission,
    TranscriptionProvider, TranscriptionRequest, map_provider_status,
};
