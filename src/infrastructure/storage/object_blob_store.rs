use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use futures::stream::BoxStream;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as StorePath;
use object_store::{MultipartUpload, ObjectStore, PutPayload};

use crate::application::ports::{BlobStore, BlobStoreError};
use crate::domain::StoragePath;

use super::url_signer::UrlSigner;

/// `BlobStore` over any `object_store` backend. Public URLs point at the
/// service's own signed blob route.
pub struct ObjectBlobStore {
    inner: Arc<dyn ObjectStore>,
    signer: UrlSigner,
}

impl ObjectBlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>, signer: UrlSigner) -> Self {
        Self { inner, signer }
    }

    pub fn local(base_path: PathBuf, signer: UrlSigner) -> Result<Self, BlobStoreError> {
        std::fs::create_dir_all(&base_path)?;
        let fs = LocalFileSystem::new_with_prefix(base_path)
            .map_err(|e| BlobStoreError::UploadFailed(e.to_string()))?;
        Ok(Self::new(Arc::new(fs), signer))
    }

    pub fn in_memory(signer: UrlSigner) -> Self {
        Self::new(Arc::new(InMemory::new()), signer)
    }

    pub fn azure(
        account: &str,
        access_key: &str,
        container: &str,
        signer: UrlSigner,
    ) -> Result<Self, BlobStoreError> {
        let store = MicrosoftAzureBuilder::new()
            .with_account(account)
            .with_access_key(access_key)
            .with_container_name(container)
            .build()
            .map_err(|e| BlobStoreError::UploadFailed(e.to_string()))?;
        Ok(Self::new(Arc::new(store), signer))
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }
}

fn not_found_or(e: object_store::Error, other: fn(String) -> BlobStoreError) -> BlobStoreError {
    match e {
        object_store::Error::NotFound { path, .. } => BlobStoreError::NotFound(path),
        e => other(e.to_string()),
    }
}

#[async_trait::async_trait]
impl BlobStore for ObjectBlobStore {
    async fn store(
        &self,
        path: &StoragePath,
        mut stream: BoxStream<'_, Result<Bytes, io::Error>>,
        _content_length: Option<u64>,
    ) -> Result<u64, BlobStoreError> {
        let store_path = StorePath::from(path.as_str());
        let mut upload = self
            .inner
            .put_multipart(&store_path)
            .await
            .map_err(|e| BlobStoreError::UploadFailed(e.to_string()))?;

        let mut total_bytes: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    let _ = upload.abort().await;
                    return Err(BlobStoreError::Io(e));
                }
            };
            total_bytes += bytes.len() as u64;
            if let Err(e) = upload.put_part(PutPayload::from(bytes)).await {
                let _ = upload.abort().await;
                return Err(BlobStoreError::UploadFailed(e.to_string()));
            }
        }

        upload
            .complete()
            .await
            .map_err(|e| BlobStoreError::UploadFailed(e.to_string()))?;

        Ok(total_bytes)
    }

    async fn put(&self, path: &StoragePath, data: Bytes) -> Result<u64, BlobStoreError> {
        let size = data.len() as u64;
        self.inner
            .put(&StorePath::from(path.as_str()), PutPayload::from(data))
            .await
            .map_err(|e| BlobStoreError::UploadFailed(e.to_string()))?;
        Ok(size)
    }

    async fn fetch(&self, path: &StoragePath) -> Result<Vec<u8>, BlobStoreError> {
        let result = self
            .inner
            .get(&StorePath::from(path.as_str()))
            .await
            .map_err(|e| not_found_or(e, BlobStoreError::DownloadFailed))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| BlobStoreError::DownloadFailed(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn delete(&self, path: &StoragePath) -> Result<(), BlobStoreError> {
        self.inner
            .delete(&StorePath::from(path.as_str()))
            .await
            .map_err(|e| not_found_or(e, BlobStoreError::DeleteFailed))
    }

    async fn head(&self, path: &StoragePath) -> Result<u64, BlobStoreError> {
        let meta = self
            .inner
            .head(&StorePath::from(path.as_str()))
            .await
            .map_err(|e| not_found_or(e, BlobStoreError::DownloadFailed))?;
        Ok(meta.size as u64)
    }

    fn public_url(&self, path: &StoragePath, ttl: Duration) -> Result<String, BlobStoreError> {
        if path.as_str().is_empty() {
            return Err(BlobStoreError::SigningFailed("empty path".to_string()));
        }
        Ok(self.signer.sign(path, ttl, Utc::now()))
    }
}
