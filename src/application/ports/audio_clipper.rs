use async_trait::async_trait;
use serde::Serialize;

/// Normalized clip output format.
pub const CLIP_SAMPLE_RATE: u32 = 16_000;
pub const CLIP_CHANNELS: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClipParams {
    #[serde(rename = "targetSeconds")]
    pub target_seconds: u32,
    #[serde(rename = "offsetSeconds")]
    pub offset_seconds: u32,
}

/// Clips in-process by driving a local transcoder binary.
#[async_trait]
pub trait LocalTranscoder: Send + Sync {
    async fn clip(&self, audio: &[u8], params: &ClipParams) -> Result<Vec<u8>, ClipError>;
}

/// Clips by calling a remote worker with a fetchable source URL.
#[async_trait]
pub trait ClipWorker: Send + Sync {
    async fn clip(&self, source_url: &str, params: &ClipParams) -> Result<Vec<u8>, ClipError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("clipping stage disabled")]
    Disabled,
    #[error("transcoder process failed: {0}")]
    ProcessFailed(String),
    #[error("clipping timed out after {0}s")]
    Timeout(u64),
    #[error("clip worker request failed: {0}")]
    RequestFailed(String),
    #[error("clipper returned no audio")]
    EmptyOutput,
}
