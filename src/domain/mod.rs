mod audio_asset;
mod identity;
mod job;
mod job_id;
mod job_status;
mod queue_entry;
mod source;
mod storage_path;
mod transcript;

pub use audio_asset::{AudioAsset, content_type_for_extension, extension_for_content_type};
pub use identity::{IdentityKey, RateClass, Tier};
pub use job::{AccuracyMode, Job, JobKind, JobOptions, OutputFormat};
pub use job_id::JobId;
pub use job_status::{JobStatus, PublicStatus};
pub use queue_entry::QueueEntry;
pub use source::{SourceDescriptor, SourceKind};
pub use storage_path::StoragePath;
pub use transcript::{
    Segment, TranscriptionResult, WordTiming, join_segment_text, segments_are_ordered,
};
pub(crate) use transcript::clamp_segments;
