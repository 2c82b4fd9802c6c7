use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who a request is charged to. Accounts come from the upstream session
/// layer; anonymous callers are keyed by their client fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum IdentityKey {
    Account(String),
    Fingerprint(String),
}

impl IdentityKey {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, IdentityKey::Fingerprint(_))
    }

    /// Stable string form used as a storage key.
    pub fn storage_key(&self) -> String {
        match self {
            IdentityKey::Account(id) => format!("acct:{}", id),
            IdentityKey::Fingerprint(fp) => format!("fp:{}", fp),
        }
    }

    pub fn parse_storage_key(key: &str) -> Option<Self> {
        if let Some(id) = key.strip_prefix("acct:") {
            return Some(IdentityKey::Account(id.to_string()));
        }
        key.strip_prefix("fp:")
            .map(|fp| IdentityKey::Fingerprint(fp.to_string()))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Pro,
    Premium,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Basic, Tier::Pro, Tier::Premium];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Pro => "pro",
            Tier::Premium => "premium",
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "basic" => Ok(Tier::Basic),
            "pro" => Ok(Tier::Pro),
            "premium" => Ok(Tier::Premium),
            other => Err(format!("Invalid tier: {}", other)),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate limit bucket an identity falls into for a given request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateClass {
    Anonymous,
    Authenticated,
    Suspicious,
}

impl RateClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateClass::Anonymous => "anonymous",
            RateClass::Authenticated => "authenticated",
            RateClass::Suspicious => "suspicious",
        }
    }
}

impl fmt::Display for RateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
