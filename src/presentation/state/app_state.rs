use std::sync::Arc;

use crate::application::ports::BlobStore;
use crate::application::services::JobService;
use crate::infrastructure::storage::UrlSigner;
use crate::presentation::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub job_service: Arc<JobService>,
    pub blob_store: Arc<dyn BlobStore>,
    pub url_signer: Arc<UrlSigner>,
    pub settings: Arc<Settings>,
}
