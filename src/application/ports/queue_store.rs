use async_trait::async_trait;

use crate::domain::{JobId, QueueEntry};

use super::StoreError;

/// Backing storage for pending queue entries. Ordering policy lives in the
/// queue service; the store only holds entries.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn push(&self, entry: QueueEntry) -> Result<(), StoreError>;

    /// Removes and returns the entry, or `None` if another consumer took it.
    async fn take(&self, job_id: JobId) -> Result<Option<QueueEntry>, StoreError>;

    async fn entries(&self) -> Result<Vec<QueueEntry>, StoreError>;
}
