pub mod admission;
mod audio_pipeline;
mod job_poller;
mod job_service;
mod job_state_machine;
mod maintenance;
mod priority_queue;
mod provider_dispatcher;
pub mod refinement;
mod tier_slots;
mod transcript_formatter;
mod transcription_worker;

pub use audio_pipeline::{
    AcquisitionError, AudioPipeline, AudioPipelineConfig, ClipStage, ClippedAudio,
};
pub use job_poller::{JobPoller, PollConfig, PollOutcome};
pub use job_service::{
    JobService, JobServiceConfig, JobServiceError, RenderedTranscript, SubmitJob, SubmittedJob,
    clip_limit,
};
pub use job_state_machine::{JobStateError, JobStateMachine};
pub use maintenance::{prune_once, run_pruning};
pub use priority_queue::{KindWeights, PriorityPolicy, PriorityQueue, TierWeights};
pub use provider_dispatcher::{
    DispatchConfig, DispatchMode, DispatchOutcome, ProviderDispatcher, ProviderFailure,
    describe_failures,
};
pub use tier_slots::{TierConcurrency, TierSlots};
pub use transcript_formatter::{render as render_transcript, timestamp};
pub use transcription_worker::{TranscriptionWorker, WorkerConfig, WorkerError};
