use std::net::IpAddr;

use sha2::{Digest, Sha256};

use crate::domain::IdentityKey;

const FINGERPRINT_LEN: usize = 32;

/// Coarse client signals collected at the edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientSignals {
    pub ip: Option<IpAddr>,
    pub user_agent: String,
    pub accept_language: String,
}

/// Truncates an address to its network prefix (/24 for IPv4, /48 for IPv6)
/// so the fingerprint survives address churn inside one network.
pub fn coarse_ip_prefix(ip: Option<&IpAddr>) -> String {
    match ip {
        Some(IpAddr::V4(v4)) => {
            let o = v4.octets();
            format!("{}.{}.{}.0/24", o[0], o[1], o[2])
        }
        Some(IpAddr::V6(v6)) => {
            let s = v6.segments();
            format!("{:x}:{:x}:{:x}::/48", s[0], s[1], s[2])
        }
        None => "unknown".to_string(),
    }
}

pub fn fingerprint(signals: &ClientSignals) -> String {
    let mut hasher = Sha256::new();
    hasher.update(coarse_ip_prefix(signals.ip.as_ref()).as_bytes());
    hasher.update(b"|");
    hasher.update(signals.user_agent.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(signals.accept_language.trim().to_lowercase().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}

/// An authenticated account always wins; the fingerprint only keys
/// anonymous callers.
pub fn resolve_identity(account: Option<&str>, signals: &ClientSignals) -> IdentityKey {
    match account.map(str::trim).filter(|a| !a.is_empty()) {
        Some(account) => IdentityKey::Account(account.to_string()),
        None => IdentityKey::Fingerprint(fingerprint(signals)),
    }
}
