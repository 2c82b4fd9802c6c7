use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{QueueStore, StoreError};
use crate::domain::{JobId, QueueEntry};

#[derive(Default)]
pub struct InMemoryQueueStore {
    entries: Mutex<HashMap<JobId, QueueEntry>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn push(&self, entry: QueueEntry) -> Result<(), StoreError> {
        self.entries.lock().await.insert(entry.job_id, entry);
        Ok(())
    }

    async fn take(&self, job_id: JobId) -> Result<Option<QueueEntry>, StoreError> {
        Ok(self.entries.lock().await.remove(&job_id))
    }

    async fn entries(&self) -> Result<Vec<QueueEntry>, StoreError> {
        Ok(self.entries.lock().await.values().cloned().collect())
    }
}
