use std::path::PathBuf;
use std::sync::Arc;

use crate::application::ports::BlobStoreError;
use crate::presentation::config::{StorageProviderSetting, StorageSettings};

use super::object_blob_store::ObjectBlobStore;
use super::url_signer::UrlSigner;

pub struct BlobStoreFactory;

impl BlobStoreFactory {
    pub fn create(settings: &StorageSettings) -> Result<Arc<ObjectBlobStore>, BlobStoreError> {
        let signer = UrlSigner::new(&settings.public_base_url, &settings.url_secret)
            .map_err(|e| BlobStoreError::UploadFailed(format!("url_secret: {}", e)))?;
        match settings.provider {
            StorageProviderSetting::Local => {
                let store = ObjectBlobStore::local(PathBuf::from(&settings.local_path), signer)?;
                Ok(Arc::new(store))
            }
            StorageProviderSetting::Memory => Ok(Arc::new(ObjectBlobStore::in_memory(signer))),
            StorageProviderSetting::Azure => {
                let account = settings.azure_account.as_deref().ok_or_else(|| {
                    BlobStoreError::UploadFailed("azure_account required".into())
                })?;
                let key = settings.azure_access_key.as_deref().ok_or_else(|| {
                    BlobStoreError::UploadFailed("azure_access_key required".into())
                })?;
                let container = settings.azure_container.as_deref().ok_or_else(|| {
                    BlobStoreError::UploadFailed("azure_container required".into())
                })?;
                let store = ObjectBlobStore::azure(account, key, container, signer)?;
                Ok(Arc::new(store))
            }
        }
    }
}
