mod abuse_detector;
mod admission_controller;
mod fingerprint;
mod quota_tracker;
mod rate_limiter;

pub use abuse_detector::{AbuseDetector, AbusePolicy, AbuseVerdict, AbuseWeights};
pub use admission_controller::{
    AdmissionContext, AdmissionController, AdmissionDecision, AdmissionError, DenialReason,
};
pub use fingerprint::{ClientSignals, coarse_ip_prefix, fingerprint, resolve_identity};
pub use quota_tracker::{
    QuotaDecision, QuotaExceeded, QuotaPolicy, QuotaRemaining, QuotaTracker, TierQuota, periods,
};
pub use rate_limiter::{RateDecision, RateLimitPolicy, RateLimitRule, RateLimiter, RateScope};
