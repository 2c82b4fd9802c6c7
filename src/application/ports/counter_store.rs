use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::StoreError;

/// Timestamped hit log keyed by an opaque counter name.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Hits recorded for `key` at or after `since`, oldest first. Older hits
    /// may be discarded by the store.
    async fn hits_since(
        &self,
        key: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError>;

    async fn record_hit(&self, key: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Drops stale hits and removes keys left empty. Returns the number of
    /// keys removed.
    async fn prune(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}
