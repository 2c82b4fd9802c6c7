use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::{AbuseRecord, AbuseStore, StoreError};

#[derive(Default)]
pub struct InMemoryAbuseStore {
    records: RwLock<HashMap<String, AbuseRecord>>,
}

impl InMemoryAbuseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AbuseStore for InMemoryAbuseStore {
    async fn load(&self, key: &str) -> Result<Option<AbuseRecord>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, record: &AbuseRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.read().await.keys().cloned().collect())
    }
}
