use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Fetches the leading bytes of a remote media URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str, max_bytes: u64) -> Result<FetchedMedia, ResolveError>;
}

/// Turns a hosted-platform reference into a playable, usually short-lived,
/// stream URL.
#[async_trait]
pub trait PlatformResolver: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, reference: &str) -> bool;

    async fn resolve_stream_url(&self, reference: &str) -> Result<String, ResolveError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no resolver supports reference: {0}")]
    Unsupported(String),
    #[error("media not found: {0}")]
    NotFound(String),
    #[error("fetch failed: {0}")]
    FetchFailed(String),
    #[error("resolver failed: {0}")]
    ResolverFailed(String),
}
