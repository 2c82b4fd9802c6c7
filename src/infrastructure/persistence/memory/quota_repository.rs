use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::application::ports::{QuotaRepository, RepositoryError, UsageDelta, UsageSnapshot};
use crate::domain::IdentityKey;

#[derive(Default)]
pub struct InMemoryQuotaRepository {
    daily: RwLock<HashMap<(String, NaiveDate), u32>>,
    monthly: RwLock<HashMap<(String, NaiveDate), (f64, f64)>>,
}

impl InMemoryQuotaRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaRepository for InMemoryQuotaRepository {
    async fn usage(
        &self,
        identity: &IdentityKey,
        day: NaiveDate,
        month_start: NaiveDate,
    ) -> Result<UsageSnapshot, RepositoryError> {
        let key = identity.storage_key();
        let daily_requests = self
            .daily
            .read()
            .await
            .get(&(key.clone(), day))
            .copied()
            .unwrap_or(0);
        let (monthly_minutes, monthly_high_accuracy_minutes) = self
            .monthly
            .read()
            .await
            .get(&(key, month_start))
            .copied()
            .unwrap_or((0.0, 0.0));
        Ok(UsageSnapshot {
            daily_requests,
            monthly_minutes,
            monthly_high_accuracy_minutes,
        })
    }

    async fn record(
        &self,
        identity: &IdentityKey,
        day: NaiveDate,
        month_start: NaiveDate,
        delta: UsageDelta,
    ) -> Result<(), RepositoryError> {
        let key = identity.storage_key();
        *self
            .daily
            .write()
            .await
            .entry((key.clone(), day))
            .or_insert(0) += delta.requests;
        let mut monthly = self.monthly.write().await;
        let entry = monthly.entry((key, month_start)).or_insert((0.0, 0.0));
        entry.0 += delta.minutes;
        entry.1 += delta.high_accuracy_minutes;
        Ok(())
    }
}
