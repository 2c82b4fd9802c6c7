use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

use crate::domain::Tier;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TierConcurrency {
    pub free: usize,
    pub basic: usize,
    pub pro: usize,
    pub premium: usize,
}

impl Default for TierConcurrency {
    fn default() -> Self {
        Self {
            free: 1,
            basic: 2,
            pro: 4,
            premium: 8,
        }
    }
}

impl TierConcurrency {
    pub fn limit(&self, tier: Tier) -> usize {
        match tier {
            Tier::Free => self.free,
            Tier::Basic => self.basic,
            Tier::Pro => self.pro,
            Tier::Premium => self.premium,
        }
        .max(1)
    }
}

/// Counting semaphore per tier. A permit is held from dispatch until the
/// job completes or fails; dropping it frees the slot.
pub struct TierSlots {
    semaphores: HashMap<Tier, Arc<Semaphore>>,
}

impl TierSlots {
    pub fn new(concurrency: &TierConcurrency) -> Self {
        let semaphores = Tier::ALL
            .iter()
            .map(|tier| (*tier, Arc::new(Semaphore::new(concurrency.limit(*tier)))))
            .collect();
        Self { semaphores }
    }

    pub async fn acquire(&self, tier: Tier) -> Result<OwnedSemaphorePermit, AcquireError> {
        let semaphore = Arc::clone(&self.semaphores[&tier]);
        semaphore.acquire_owned().await
    }

    /// Takes a slot only if one is free right now.
    pub fn try_acquire(&self, tier: Tier) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphores[&tier]).try_acquire_owned().ok()
    }

    pub fn available(&self, tier: Tier) -> usize {
        self.semaphores[&tier].available_permits()
    }
}
