use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Notify;

use crate::application::ports::{QueueStore, StoreError};
use crate::domain::{IdentityKey, Job, JobId, JobKind, QueueEntry, Tier};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TierWeights {
    pub free: i64,
    pub basic: i64,
    pub pro: i64,
    pub premium: i64,
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            free: 0,
            basic: 10,
            pro: 20,
            premium: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KindWeights {
    pub preview: i64,
    pub standard: i64,
    pub high_accuracy: i64,
}

impl Default for KindWeights {
    fn default() -> Self {
        Self {
            preview: 3,
            standard: 2,
            high_accuracy: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriorityPolicy {
    pub tier_weights: TierWeights,
    pub kind_weights: KindWeights,
    /// The age bonus grows linearly and reaches `max_age_boost` after this
    /// many seconds of waiting.
    pub starvation_bound_secs: i64,
    pub max_age_boost: i64,
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        Self {
            tier_weights: TierWeights::default(),
            kind_weights: KindWeights::default(),
            starvation_bound_secs: 600,
            max_age_boost: 40,
        }
    }
}

impl PriorityPolicy {
    pub fn tier_weight(&self, tier: Tier) -> i64 {
        match tier {
            Tier::Free => self.tier_weights.free,
            Tier::Basic => self.tier_weights.basic,
            Tier::Pro => self.tier_weights.pro,
            Tier::Premium => self.tier_weights.premium,
        }
    }

    pub fn kind_weight(&self, kind: JobKind) -> i64 {
        match kind {
            JobKind::Preview => self.kind_weights.preview,
            JobKind::Standard => self.kind_weights.standard,
            JobKind::HighAccuracy => self.kind_weights.high_accuracy,
        }
    }

    pub fn base_score(&self, tier: Tier, kind: JobKind) -> i64 {
        self.tier_weight(tier) + self.kind_weight(kind)
    }

    pub fn age_boost(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let waited = (now - created_at).num_seconds().max(0);
        if self.starvation_bound_secs <= 0 || waited >= self.starvation_bound_secs {
            return self.max_age_boost;
        }
        self.max_age_boost * waited / self.starvation_bound_secs
    }

    /// Largest gap between two base scores. An age boost above this lets a
    /// fully aged entry outrank any fresh one.
    pub fn base_score_spread(&self) -> i64 {
        let scores: Vec<i64> = Tier::ALL
            .iter()
            .flat_map(|tier| {
                [JobKind::Preview, JobKind::Standard, JobKind::HighAccuracy]
                    .into_iter()
                    .map(move |kind| (*tier, kind))
            })
            .map(|(tier, kind)| self.base_score(tier, kind))
            .collect();
        let max = scores.iter().copied().max().unwrap_or(0);
        let min = scores.iter().copied().min().unwrap_or(0);
        max - min
    }

    pub fn validate(&self) -> Result<(), String> {
        let tiers = &self.tier_weights;
        if !(tiers.premium > tiers.pro && tiers.pro > tiers.basic && tiers.basic > tiers.free) {
            return Err("tier weights must order premium > pro > basic > free".to_string());
        }
        if self.max_age_boost <= self.base_score_spread() {
            return Err(format!(
                "max_age_boost ({}) must exceed the base score spread ({})",
                self.max_age_boost,
                self.base_score_spread()
            ));
        }
        Ok(())
    }
}

pub struct PriorityQueue {
    store: Arc<dyn QueueStore>,
    policy: PriorityPolicy,
    notify: Notify,
}

impl PriorityQueue {
    pub fn new(store: Arc<dyn QueueStore>, policy: PriorityPolicy) -> Self {
        Self {
            store,
            policy,
            notify: Notify::new(),
        }
    }

    pub fn policy(&self) -> &PriorityPolicy {
        &self.policy
    }

    pub fn entry_for(&self, job: &Job, enqueued_at: DateTime<Utc>) -> QueueEntry {
        QueueEntry {
            job_id: job.id,
            owner: job.owner.clone(),
            tier: job.tier,
            kind: job.kind(),
            base_score: self.policy.base_score(job.tier, job.kind()),
            created_at: enqueued_at,
        }
    }

    pub fn effective_score(&self, entry: &QueueEntry, now: DateTime<Utc>) -> i64 {
        entry.base_score + self.policy.age_boost(entry.created_at, now)
    }

    pub async fn enqueue(&self, entry: QueueEntry) -> Result<JobId, StoreError> {
        let job_id = entry.job_id;
        tracing::debug!(
            job_id = %job_id,
            tier = %entry.tier,
            kind = %entry.kind,
            base_score = entry.base_score,
            "Job enqueued"
        );
        self.store.push(entry).await?;
        self.notify.notify_one();
        Ok(job_id)
    }

    /// Takes the highest effective score; ties go to the earliest entry.
    pub async fn dequeue(&self, now: DateTime<Utc>) -> Result<Option<QueueEntry>, StoreError> {
        Ok(self
            .dequeue_reserving(now, |_| Some(()))
            .await?
            .map(|(entry, ())| entry))
    }

    /// Takes the best entry whose tier `reserve` can grant right now. The
    /// reservation is made before the entry leaves the store, so an entry of
    /// a saturated tier keeps its position and stays cancellable.
    pub async fn dequeue_reserving<R>(
        &self,
        now: DateTime<Utc>,
        mut reserve: impl FnMut(Tier) -> Option<R>,
    ) -> Result<Option<(QueueEntry, R)>, StoreError> {
        let mut saturated: Vec<Tier> = Vec::new();
        for (candidate, score) in self.ordered(self.store.entries().await?, now) {
            if saturated.contains(&candidate.tier) {
                continue;
            }
            let Some(reservation) = reserve(candidate.tier) else {
                saturated.push(candidate.tier);
                continue;
            };
            // None means a cancel won the race; the reservation drops here.
            if let Some(entry) = self.store.take(candidate.job_id).await? {
                tracing::debug!(
                    job_id = %entry.job_id,
                    score = score,
                    waited_secs = (now - entry.created_at).num_seconds(),
                    "Job dequeued"
                );
                return Ok(Some((entry, reservation)));
            }
        }
        Ok(None)
    }

    /// 1-based position under the current effective order.
    pub async fn position_of(
        &self,
        job_id: JobId,
        now: DateTime<Utc>,
    ) -> Result<Option<usize>, StoreError> {
        let ordered = self.ordered(self.store.entries().await?, now);
        Ok(ordered
            .iter()
            .position(|(entry, _)| entry.job_id == job_id)
            .map(|idx| idx + 1))
    }

    /// Removes a pending entry if `requester` owns it.
    pub async fn cancel(&self, job_id: JobId, requester: &IdentityKey) -> Result<bool, StoreError> {
        let entries = self.store.entries().await?;
        let Some(entry) = entries.iter().find(|e| e.job_id == job_id) else {
            return Ok(false);
        };
        if &entry.owner != requester {
            tracing::warn!(job_id = %job_id, "Cancel refused: requester does not own job");
            return Ok(false);
        }
        Ok(self.store.take(job_id).await?.is_some())
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.store.entries().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Resolves once something was enqueued or a slot was freed since the
    /// last wait.
    pub async fn wait_for_work(&self) {
        self.notify.notified().await;
    }

    /// Wakes a waiting consumer without enqueuing.
    pub fn wake(&self) {
        self.notify.notify_one();
    }

    pub fn ordered(&self, entries: Vec<QueueEntry>, now: DateTime<Utc>) -> Vec<(QueueEntry, i64)> {
        let mut scored: Vec<(QueueEntry, i64)> = entries
            .into_iter()
            .map(|entry| {
                let score = self.effective_score(&entry, now);
                (entry, score)
            })
            .collect();
        scored.sort_by(|(a, sa), (b, sb)| {
            sb.cmp(sa)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| compare_ids(a.job_id, b.job_id))
        });
        scored
    }
}

fn compare_ids(a: JobId, b: JobId) -> Ordering {
    a.as_uuid().cmp(&b.as_uuid())
}
