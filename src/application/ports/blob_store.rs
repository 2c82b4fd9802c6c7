use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::domain::StoragePath;

/// Durable blob storage for uploads, audio assets and rendered transcripts.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(
        &self,
        path: &StoragePath,
        stream: BoxStream<'_, Result<Bytes, io::Error>>,
        content_length: Option<u64>,
    ) -> Result<u64, BlobStoreError>;

    async fn put(&self, path: &StoragePath, data: Bytes) -> Result<u64, BlobStoreError>;

    async fn fetch(&self, path: &StoragePath) -> Result<Vec<u8>, BlobStoreError>;

    async fn delete(&self, path: &StoragePath) -> Result<(), BlobStoreError>;

    async fn head(&self, path: &StoragePath) -> Result<u64, BlobStoreError>;

    /// A URL external workers can fetch the blob from, valid for `ttl`.
    fn public_url(&self, path: &StoragePath, ttl: Duration) -> Result<String, BlobStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("url signing failed: {0}")]
    SigningFailed(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
