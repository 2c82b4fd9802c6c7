use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::application::ports::{QuotaRepository, RepositoryError, UsageDelta, UsageSnapshot};
use crate::domain::{AccuracyMode, IdentityKey, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TierQuota {
    pub daily_requests: u32,
    pub monthly_minutes: f64,
    pub monthly_high_accuracy_minutes: f64,
    #[serde(default)]
    pub unlimited: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuotaPolicy {
    pub free: TierQuota,
    pub basic: TierQuota,
    pub pro: TierQuota,
    pub premium: TierQuota,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            free: TierQuota {
                daily_requests: 5,
                monthly_minutes: 30.0,
                monthly_high_accuracy_minutes: 0.0,
                unlimited: false,
            },
            basic: TierQuota {
                daily_requests: 50,
                monthly_minutes: 300.0,
                monthly_high_accuracy_minutes: 30.0,
                unlimited: false,
            },
            pro: TierQuota {
                daily_requests: 200,
                monthly_minutes: 1200.0,
                monthly_high_accuracy_minutes: 120.0,
                unlimited: false,
            },
            premium: TierQuota {
                daily_requests: 0,
                monthly_minutes: 0.0,
                monthly_high_accuracy_minutes: 0.0,
                unlimited: true,
            },
        }
    }
}

impl QuotaPolicy {
    pub fn for_tier(&self, tier: Tier) -> TierQuota {
        match tier {
            Tier::Free => self.free,
            Tier::Basic => self.basic,
            Tier::Pro => self.pro,
            Tier::Premium => self.premium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaExceeded {
    DailyRequests,
    MonthlyMinutes,
    HighAccuracyMinutes,
}

impl QuotaExceeded {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaExceeded::DailyRequests => "daily_requests",
            QuotaExceeded::MonthlyMinutes => "monthly_minutes",
            QuotaExceeded::HighAccuracyMinutes => "high_accuracy_minutes",
        }
    }
}

impl std::fmt::Display for QuotaExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remaining balances; `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct QuotaRemaining {
    pub daily_requests: Option<u32>,
    pub monthly_minutes: Option<f64>,
    pub monthly_high_accuracy_minutes: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaDecision {
    pub exceeded: Option<QuotaExceeded>,
    pub remaining: QuotaRemaining,
}

impl QuotaDecision {
    pub fn allowed(&self) -> bool {
        self.exceeded.is_none()
    }
}

pub struct QuotaTracker {
    repository: Arc<dyn QuotaRepository>,
    policy: QuotaPolicy,
}

impl QuotaTracker {
    pub fn new(repository: Arc<dyn QuotaRepository>, policy: QuotaPolicy) -> Self {
        Self { repository, policy }
    }

    /// Compares current usage plus the request against the tier ceilings.
    /// Does not record anything.
    pub async fn check(
        &self,
        identity: &IdentityKey,
        tier: Tier,
        requested_minutes: f64,
        accuracy: AccuracyMode,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, RepositoryError> {
        let quota = self.policy.for_tier(tier);
        if quota.unlimited {
            return Ok(QuotaDecision {
                exceeded: None,
                remaining: QuotaRemaining::default(),
            });
        }

        let (day, month) = periods(now);
        let usage = self.repository.usage(identity, day, month).await?;
        let requested_minutes = requested_minutes.max(0.0);

        let exceeded = if usage.daily_requests + 1 > quota.daily_requests {
            Some(QuotaExceeded::DailyRequests)
        } else {
            match accuracy {
                AccuracyMode::Standard
                    if usage.monthly_minutes + requested_minutes > quota.monthly_minutes =>
                {
                    Some(QuotaExceeded::MonthlyMinutes)
                }
                AccuracyMode::High
                    if usage.monthly_high_accuracy_minutes + requested_minutes
                        > quota.monthly_high_accuracy_minutes =>
                {
                    Some(QuotaExceeded::HighAccuracyMinutes)
                }
                _ => None,
            }
        };

        Ok(QuotaDecision {
            exceeded,
            remaining: remaining(&quota, &usage),
        })
    }

    /// Records an admitted request and returns the balances left after it.
    pub async fn commit(
        &self,
        identity: &IdentityKey,
        tier: Tier,
        minutes: f64,
        accuracy: AccuracyMode,
        now: DateTime<Utc>,
    ) -> Result<QuotaRemaining, RepositoryError> {
        let quota = self.policy.for_tier(tier);
        let (day, month) = periods(now);
        let delta = usage_delta(1, minutes.max(0.0), accuracy);
        self.repository.record(identity, day, month, delta).await?;

        if quota.unlimited {
            return Ok(QuotaRemaining::default());
        }
        let usage = self.repository.usage(identity, day, month).await?;
        Ok(remaining(&quota, &usage))
    }

    /// Charges minutes found beyond an admitted reservation. Nothing is
    /// recorded when the extra would push the monthly pool past its ceiling.
    pub async fn settle(
        &self,
        identity: &IdentityKey,
        tier: Tier,
        extra_minutes: f64,
        accuracy: AccuracyMode,
        now: DateTime<Utc>,
    ) -> Result<Option<QuotaExceeded>, RepositoryError> {
        if extra_minutes <= 0.0 {
            return Ok(None);
        }
        let quota = self.policy.for_tier(tier);
        let (day, month) = periods(now);
        if !quota.unlimited {
            let usage = self.repository.usage(identity, day, month).await?;
            let exceeded = match accuracy {
                AccuracyMode::Standard
                    if usage.monthly_minutes + extra_minutes > quota.monthly_minutes =>
                {
                    Some(QuotaExceeded::MonthlyMinutes)
                }
                AccuracyMode::High
                    if usage.monthly_high_accuracy_minutes + extra_minutes
                        > quota.monthly_high_accuracy_minutes =>
                {
                    Some(QuotaExceeded::HighAccuracyMinutes)
                }
                _ => None,
            };
            if exceeded.is_some() {
                return Ok(exceeded);
            }
        }
        let delta = usage_delta(0, extra_minutes, accuracy);
        self.repository.record(identity, day, month, delta).await?;
        Ok(None)
    }

    pub fn is_unlimited(&self, tier: Tier) -> bool {
        self.policy.for_tier(tier).unlimited
    }

    pub async fn remaining(
        &self,
        identity: &IdentityKey,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> Result<QuotaRemaining, RepositoryError> {
        let quota = self.policy.for_tier(tier);
        if quota.unlimited {
            return Ok(QuotaRemaining::default());
        }
        let (day, month) = periods(now);
        let usage = self.repository.usage(identity, day, month).await?;
        Ok(remaining(&quota, &usage))
    }
}

fn usage_delta(requests: u32, minutes: f64, accuracy: AccuracyMode) -> UsageDelta {
    match accuracy {
        AccuracyMode::Standard => UsageDelta {
            requests,
            minutes,
            high_accuracy_minutes: 0.0,
        },
        AccuracyMode::High => UsageDelta {
            requests,
            minutes: 0.0,
            high_accuracy_minutes: minutes,
        },
    }
}

fn remaining(quota: &TierQuota, usage: &UsageSnapshot) -> QuotaRemaining {
    QuotaRemaining {
        daily_requests: Some(quota.daily_requests.saturating_sub(usage.daily_requests)),
        monthly_minutes: Some((quota.monthly_minutes - usage.monthly_minutes).max(0.0)),
        monthly_high_accuracy_minutes: Some(
            (quota.monthly_high_accuracy_minutes - usage.monthly_high_accuracy_minutes).max(0.0),
        ),
    }
}

pub fn periods(now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    let day = now.date_naive();
    let month = day.with_day(1).unwrap_or(day);
    (day, month)
}
