use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::application::ports::{RepositoryError, StoreError};
use crate::domain::{AccuracyMode, IdentityKey, RateClass, Tier};

use super::abuse_detector::AbuseDetector;
use super::fingerprint::ClientSignals;
use super::quota_tracker::{QuotaExceeded, QuotaRemaining, QuotaTracker};
use super::rate_limiter::{RateDecision, RateLimiter, RateScope};

#[derive(Debug, Clone, Default)]
pub struct AdmissionContext {
    pub signals: ClientSignals,
    /// The source reference being requested, used for repetition signals.
    pub target: Option<String>,
    pub requested_minutes: f64,
    pub accuracy: AccuracyMode,
    /// Verdict of the upstream bot-challenge verifier.
    pub bot_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DenialReason {
    Blocked,
    RateLimited(RateScope),
    QuotaExceeded(QuotaExceeded),
    AbuseDetected,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::Blocked => "blocked",
            DenialReason::RateLimited(RateScope::Minute) => "rate_limited_minute",
            DenialReason::RateLimited(RateScope::Day) => "rate_limited_day",
            DenialReason::QuotaExceeded(_) => "quota_exceeded",
            DenialReason::AbuseDetected => "abuse_detected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub reason: Option<DenialReason>,
    pub retry_after: Option<Duration>,
    pub remaining: Option<QuotaRemaining>,
    pub rate_class: RateClass,
}

impl AdmissionDecision {
    fn allow(class: RateClass, remaining: QuotaRemaining) -> Self {
        Self {
            allowed: true,
            reason: None,
            retry_after: None,
            remaining: Some(remaining),
            rate_class: class,
        }
    }

    fn deny(class: RateClass, reason: DenialReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            retry_after: None,
            remaining: None,
            rate_class: class,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("admission store: {0}")]
    Store(#[from] StoreError),
    #[error("quota repository: {0}")]
    Repository(#[from] RepositoryError),
}

/// Runs the admission checks in a fixed order and stops at the first
/// failure: blocked, rate limit, quota, abuse signals. Quota usage is only
/// committed once every check has passed.
pub struct AdmissionController {
    rate_limiter: RateLimiter,
    quota_tracker: QuotaTracker,
    abuse_detector: AbuseDetector,
}

impl AdmissionController {
    pub fn new(
        rate_limiter: RateLimiter,
        quota_tracker: QuotaTracker,
        abuse_detector: AbuseDetector,
    ) -> Self {
        Self {
            rate_limiter,
            quota_tracker,
            abuse_detector,
        }
    }

    pub fn abuse_detector(&self) -> &AbuseDetector {
        &self.abuse_detector
    }

    pub fn quota_tracker(&self) -> &QuotaTracker {
        &self.quota_tracker
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    #[tracing::instrument(skip(self, context), fields(identity = %identity, tier = %tier))]
    pub async fn admit(
        &self,
        identity: &IdentityKey,
        tier: Tier,
        context: &AdmissionContext,
        now: DateTime<Utc>,
    ) -> Result<AdmissionDecision, AdmissionError> {
        let score = self.abuse_detector.score(identity, now).await?;
        let class = self.rate_class(identity, context, score);

        if self.abuse_detector.is_blocked(identity).await? {
            tracing::info!("Admission denied: identity blocked");
            return Ok(AdmissionDecision::deny(class, DenialReason::Blocked));
        }

        if let RateDecision::Limited { scope, retry_after } =
            self.rate_limiter.check(identity, class, now).await?
        {
            tracing::info!(
                class = %class,
                retry_after_secs = retry_after.as_secs(),
                "Admission denied: rate limited"
            );
            let mut decision = AdmissionDecision::deny(class, DenialReason::RateLimited(scope));
            decision.retry_after = Some(retry_after);
            return Ok(decision);
        }

        let quota = self
            .quota_tracker
            .check(
                identity,
                tier,
                context.requested_minutes,
                context.accuracy,
                now,
            )
            .await?;
        if let Some(exceeded) = quota.exceeded {
            tracing::info!(exceeded = ?exceeded, "Admission denied: quota exceeded");
            let mut decision = AdmissionDecision::deny(class, DenialReason::QuotaExceeded(exceeded));
            decision.remaining = Some(quota.remaining);
            return Ok(decision);
        }

        let verdict = self
            .abuse_detector
            .observe(identity, &context.signals, context.target.as_deref(), now)
            .await?;
        if verdict.blocked {
            tracing::info!(score = verdict.score, "Admission denied: abuse threshold crossed");
            return Ok(AdmissionDecision::deny(class, DenialReason::AbuseDetected));
        }

        let remaining = self
            .quota_tracker
            .commit(
                identity,
                tier,
                context.requested_minutes,
                context.accuracy,
                now,
            )
            .await?;

        Ok(AdmissionDecision::allow(class, remaining))
    }

    fn rate_class(&self, identity: &IdentityKey, context: &AdmissionContext, score: f64) -> RateClass {
        if score >= self.abuse_detector.policy().suspicious_score {
            return RateClass::Suspicious;
        }
        match identity {
            IdentityKey::Account(_) => RateClass::Authenticated,
            IdentityKey::Fingerprint(_) if context.bot_verified => RateClass::Anonymous,
            IdentityKey::Fingerprint(_) => RateClass::Suspicious,
        }
    }
}
