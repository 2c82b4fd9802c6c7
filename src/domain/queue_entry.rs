use chrono::{DateTime, Utc};

use super::{IdentityKey, JobId, JobKind, Tier};

/// A pending job waiting for a worker. Exists only while the job is queued.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub job_id: JobId,
    pub owner: IdentityKey,
    pub tier: Tier,
    pub kind: JobKind,
    pub base_score: i64,
    pub created_at: DateTime<Utc>,
}
