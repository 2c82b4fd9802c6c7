use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::IdentityKey;

use super::RepositoryError;

/// Usage inside the current day (requests) and month (minutes).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UsageSnapshot {
    pub daily_requests: u32,
    pub monthly_minutes: f64,
    pub monthly_high_accuracy_minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UsageDelta {
    pub requests: u32,
    pub minutes: f64,
    pub high_accuracy_minutes: f64,
}

/// Durable per-identity usage counters. `day` and `month_start` identify
/// the windows; a new window starts from zero.
#[async_trait]
pub trait QuotaRepository: Send + Sync {
    async fn usage(
        &self,
        identity: &IdentityKey,
        day: NaiveDate,
        month_start: NaiveDate,
    ) -> Result<UsageSnapshot, RepositoryError>;

    async fn record(
        &self,
        identity: &IdentityKey,
        day: NaiveDate,
        month_start: NaiveDate,
        delta: UsageDelta,
    ) -> Result<(), RepositoryError>;
}
