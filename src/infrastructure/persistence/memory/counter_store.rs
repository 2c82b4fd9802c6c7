use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::application::ports::{CounterStore, StoreError};

/// Hits older than this are dropped on write and on prune.
const RETENTION_HOURS: i64 = 48;

#[derive(Default)]
pub struct InMemoryCounterStore {
    hits: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn hits_since(
        &self,
        key: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let hits = self.hits.lock().await;
        Ok(hits
            .get(key)
            .map(|log| log.iter().filter(|at| **at >= since).copied().collect())
            .unwrap_or_default())
    }

    async fn record_hit(&self, key: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut hits = self.hits.lock().await;
        let log = hits.entry(key.to_string()).or_default();
        let horizon = at - TimeDelta::hours(RETENTION_HOURS);
        while log.front().is_some_and(|oldest| *oldest < horizon) {
            log.pop_front();
        }
        let position = log.partition_point(|existing| *existing <= at);
        log.insert(position, at);
        Ok(())
    }

    async fn prune(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut hits = self.hits.lock().await;
        let horizon = now - TimeDelta::hours(RETENTION_HOURS);
        let before = hits.len();
        hits.retain(|_, log| {
            while log.front().is_some_and(|oldest| *oldest < horizon) {
                log.pop_front();
            }
            !log.is_empty()
        });
        Ok(before - hits.len())
    }
}
