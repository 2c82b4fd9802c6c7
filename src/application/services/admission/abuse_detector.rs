use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::application::ports::{
    AbuseRecord, AbuseSignal, AbuseStore, Observation, SignalHit, StoreError,
};
use crate::domain::IdentityKey;

use super::fingerprint::{ClientSignals, coarse_ip_prefix};

const ROLLING_WINDOW_HOURS: i64 = 24;
const MAX_OBSERVATIONS: usize = 1_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AbuseWeights {
    pub burst: f64,
    pub target_repetition: f64,
    pub ip_cardinality: f64,
    pub user_agent_cardinality: f64,
    pub bot_user_agent: f64,
}

impl Default for AbuseWeights {
    fn default() -> Self {
        Self {
            burst: 3.0,
            target_repetition: 2.0,
            ip_cardinality: 2.5,
            user_agent_cardinality: 1.5,
            bot_user_agent: 5.0,
        }
    }
}

impl AbuseWeights {
    fn weight(&self, signal: AbuseSignal) -> f64 {
        match signal {
            AbuseSignal::Burst => self.burst,
            AbuseSignal::TargetRepetition => self.target_repetition,
            AbuseSignal::IpCardinality => self.ip_cardinality,
            AbuseSignal::UserAgentCardinality => self.user_agent_cardinality,
            AbuseSignal::BotUserAgent => self.bot_user_agent,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AbusePolicy {
    pub burst_per_minute: usize,
    pub repeat_target_limit: usize,
    pub max_distinct_ips: usize,
    pub max_distinct_user_agents: usize,
    pub bot_user_agent_markers: Vec<String>,
    pub weights: AbuseWeights,
    pub block_threshold: f64,
    /// Score at which the identity is moved to the suspicious rate class.
    pub suspicious_score: f64,
    /// A signal is counted at most once per cooldown.
    pub signal_cooldown_secs: i64,
}

impl Default for AbusePolicy {
    fn default() -> Self {
        Self {
            burst_per_minute: 20,
            repeat_target_limit: 5,
            max_distinct_ips: 5,
            max_distinct_user_agents: 4,
            bot_user_agent_markers: [
                "bot", "crawler", "spider", "curl", "wget", "python-requests", "httpclient",
                "headless", "scrapy", "go-http-client",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect(),
            weights: AbuseWeights::default(),
            block_threshold: 10.0,
            suspicious_score: 4.0,
            signal_cooldown_secs: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbuseVerdict {
    pub score: f64,
    pub raised: Vec<AbuseSignal>,
    pub blocked: bool,
}

pub struct AbuseDetector {
    store: Arc<dyn AbuseStore>,
    policy: AbusePolicy,
}

impl AbuseDetector {
    pub fn new(store: Arc<dyn AbuseStore>, policy: AbusePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &AbusePolicy {
        &self.policy
    }

    pub async fn is_blocked(&self, identity: &IdentityKey) -> Result<bool, StoreError> {
        let record = self.store.load(&identity.storage_key()).await?;
        Ok(record.is_some_and(|r| r.is_blocked()))
    }

    pub async fn score(&self, identity: &IdentityKey, now: DateTime<Utc>) -> Result<f64, StoreError> {
        let record = self.store.load(&identity.storage_key()).await?;
        Ok(record
            .map(|r| r.score_since(window_start(now)))
            .unwrap_or(0.0))
    }

    /// Records one request and re-evaluates every signal over the rolling
    /// window. Crossing the block threshold blocks the identity until
    /// [`AbuseDetector::reset`].
    pub async fn observe(
        &self,
        identity: &IdentityKey,
        signals: &ClientSignals,
        target: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AbuseVerdict, StoreError> {
        let key = identity.storage_key();
        let mut record = self.store.load(&key).await?.unwrap_or_default();
        let since = window_start(now);
        prune_record(&mut record, since);

        record.observations.push(Observation {
            at: now,
            ip_prefix: coarse_ip_prefix(signals.ip.as_ref()),
            user_agent: signals.user_agent.trim().to_string(),
            target: target.map(|t| t.trim().to_string()),
        });
        if record.observations.len() > MAX_OBSERVATIONS {
            let excess = record.observations.len() - MAX_OBSERVATIONS;
            record.observations.drain(..excess);
        }

        let raised = self.evaluate(&record, signals, target, now);
        let cooldown = TimeDelta::seconds(self.policy.signal_cooldown_secs);
        for signal in &raised {
            let cooling = record
                .signals
                .iter()
                .any(|hit| hit.signal == *signal && now - hit.at < cooldown);
            if !cooling {
                record.signals.push(SignalHit {
                    at: now,
                    signal: *signal,
                    weight: self.policy.weights.weight(*signal),
                });
            }
        }

        let score = record.score_since(since);
        if score >= self.policy.block_threshold && !record.is_blocked() {
            record.blocked_at = Some(now);
            tracing::warn!(
                identity = %identity,
                score = score,
                threshold = self.policy.block_threshold,
                "Identity blocked by abuse detector"
            );
        } else if !raised.is_empty() {
            tracing::debug!(
                identity = %identity,
                score = score,
                signals = ?raised,
                "Abuse signals raised"
            );
        }

        let blocked = record.is_blocked();
        self.store.save(&key, &record).await?;

        Ok(AbuseVerdict {
            score,
            raised,
            blocked,
        })
    }

    fn evaluate(
        &self,
        record: &AbuseRecord,
        signals: &ClientSignals,
        target: Option<&str>,
        now: DateTime<Utc>,
    ) -> Vec<AbuseSignal> {
        let mut raised = Vec::new();
        let minute_ago = now - TimeDelta::seconds(60);

        let recent = record
            .observations
            .iter()
            .filter(|o| o.at >= minute_ago)
            .count();
        if recent > self.policy.burst_per_minute {
            raised.push(AbuseSignal::Burst);
        }

        if let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) {
            let repeats = record
                .observations
                .iter()
                .filter(|o| o.target.as_deref() == Some(target))
                .count();
            if repeats > self.policy.repeat_target_limit {
                raised.push(AbuseSignal::TargetRepetition);
            }
        }

        let ips: HashSet<&str> = record
            .observations
            .iter()
            .map(|o| o.ip_prefix.as_str())
            .collect();
        if ips.len() > self.policy.max_distinct_ips {
            raised.push(AbuseSignal::IpCardinality);
        }

        let agents: HashSet<&str> = record
            .observations
            .iter()
            .map(|o| o.user_agent.as_str())
            .collect();
        if agents.len() > self.policy.max_distinct_user_agents {
            raised.push(AbuseSignal::UserAgentCardinality);
        }

        if self.is_bot_like(&signals.user_agent) {
            raised.push(AbuseSignal::BotUserAgent);
        }

        raised
    }

    pub fn is_bot_like(&self, user_agent: &str) -> bool {
        let ua = user_agent.trim().to_lowercase();
        ua.is_empty()
            || self
                .policy
                .bot_user_agent_markers
                .iter()
                .any(|marker| ua.contains(&marker.to_lowercase()))
    }

    /// Manual unblock. Returns whether the identity had any state.
    pub async fn reset(&self, identity: &IdentityKey) -> Result<bool, StoreError> {
        let key = identity.storage_key();
        let existed = self.store.load(&key).await?.is_some();
        self.store.remove(&key).await?;
        if existed {
            tracing::info!(identity = %identity, "Abuse state reset");
        }
        Ok(existed)
    }

    /// Drops expired observations and signals; removes records that are
    /// empty and not blocked. Returns the number of removed records.
    pub async fn prune(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let since = window_start(now);
        let mut removed = 0;
        for key in self.store.keys().await? {
            let Some(mut record) = self.store.load(&key).await? else {
                continue;
            };
            prune_record(&mut record, since);
            if record.observations.is_empty() && record.signals.is_empty() && !record.is_blocked()
            {
                self.store.remove(&key).await?;
                removed += 1;
            } else {
                self.store.save(&key, &record).await?;
            }
        }
        Ok(removed)
    }
}

fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - TimeDelta::hours(ROLLING_WINDOW_HOURS)
}

fn prune_record(record: &mut AbuseRecord, since: DateTime<Utc>) {
    record.observations.retain(|o| o.at >= since);
    record.signals.retain(|s| s.at >= since);
}
