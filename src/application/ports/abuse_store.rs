use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbuseSignal {
    Burst,
    TargetRepetition,
    IpCardinality,
    UserAgentCardinality,
    BotUserAgent,
}

impl AbuseSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbuseSignal::Burst => "burst",
            AbuseSignal::TargetRepetition => "target_repetition",
            AbuseSignal::IpCardinality => "ip_cardinality",
            AbuseSignal::UserAgentCardinality => "user_agent_cardinality",
            AbuseSignal::BotUserAgent => "bot_user_agent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub at: DateTime<Utc>,
    pub ip_prefix: String,
    pub user_agent: String,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalHit {
    pub at: DateTime<Utc>,
    pub signal: AbuseSignal,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AbuseRecord {
    pub observations: Vec<Observation>,
    pub signals: Vec<SignalHit>,
    pub blocked_at: Option<DateTime<Utc>>,
}

impl AbuseRecord {
    pub fn score_since(&self, since: DateTime<Utc>) -> f64 {
        self.signals
            .iter()
            .filter(|s| s.at >= since)
            .map(|s| s.weight)
            .sum()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_at.is_some()
    }
}

#[async_trait]
pub trait AbuseStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<AbuseRecord>, StoreError>;

    async fn save(&self, key: &str, record: &AbuseRecord) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}
