use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::application::ports::{CounterStore, StoreError};
use crate::domain::{IdentityKey, RateClass};

const WINDOW_SECONDS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RateLimitRule {
    pub per_minute: u32,
    pub per_day: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitPolicy {
    pub anonymous: RateLimitRule,
    pub authenticated: RateLimitRule,
    pub suspicious: RateLimitRule,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            anonymous: RateLimitRule {
                per_minute: 10,
                per_day: 50,
            },
            authenticated: RateLimitRule {
                per_minute: 30,
                per_day: 500,
            },
            suspicious: RateLimitRule {
                per_minute: 3,
                per_day: 10,
            },
        }
    }
}

impl RateLimitPolicy {
    pub fn rule_for(&self, class: RateClass) -> RateLimitRule {
        match class {
            RateClass::Anonymous => self.anonymous,
            RateClass::Authenticated => self.authenticated,
            RateClass::Suspicious => self.suspicious,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateScope {
    Minute,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited {
        scope: RateScope,
        retry_after: Duration,
    },
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    /// Checks both windows and records the hit only when it is admitted.
    pub async fn check(
        &self,
        identity: &IdentityKey,
        class: RateClass,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, StoreError> {
        let rule = self.policy.rule_for(class);
        let minute_key = format!("rate:{}:{}:minute", class, identity);
        let day_key = format!("rate:{}:{}:day", class, identity);

        let window_start = now - TimeDelta::seconds(WINDOW_SECONDS);
        let minute_hits = self.store.hits_since(&minute_key, window_start).await?;
        if minute_hits.len() >= rule.per_minute as usize {
            let oldest = minute_hits.first().copied().unwrap_or(now);
            let reopens = oldest + TimeDelta::seconds(WINDOW_SECONDS);
            return Ok(RateDecision::Limited {
                scope: RateScope::Minute,
                retry_after: seconds_until(now, reopens),
            });
        }

        let day_start = start_of_day(now);
        let day_hits = self.store.hits_since(&day_key, day_start).await?;
        if day_hits.len() >= rule.per_day as usize {
            return Ok(RateDecision::Limited {
                scope: RateScope::Day,
                retry_after: seconds_until(now, day_start + TimeDelta::days(1)),
            });
        }

        self.store.record_hit(&minute_key, now).await?;
        self.store.record_hit(&day_key, now).await?;
        Ok(RateDecision::Allowed)
    }

    /// Forgets identities whose counters have gone quiet.
    pub async fn prune(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.store.prune(now).await
    }
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

/// Whole seconds until `at`, never less than one.
fn seconds_until(now: DateTime<Utc>, at: DateTime<Utc>) -> Duration {
    let millis = (at - now).num_milliseconds().max(0) as u64;
    Duration::from_secs(millis.div_ceil(1000).max(1))
}
