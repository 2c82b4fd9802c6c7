use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::Deserialize;

use crate::application::ports::{
    ProviderError, ProviderJobRef, ProviderStatus, ProviderSubmission, TranscriptionProvider,
    TranscriptionRequest,
};
use crate::domain::TranscriptionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Try providers one after another in configured order.
    Sequential,
    /// Submit to every provider at once; the first success wins.
    Concurrent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub mode: DispatchMode,
    pub provider_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Sequential,
            provider_timeout_secs: 600,
            poll_interval_ms: 2_000,
            max_poll_attempts: 300,
        }
    }
}

#[derive(Debug)]
pub struct ProviderFailure {
    pub provider_id: String,
    pub error: ProviderError,
}

#[derive(Debug)]
pub enum DispatchOutcome {
    Success {
        provider_id: String,
        result: TranscriptionResult,
    },
    AllFailed {
        failures: Vec<ProviderFailure>,
    },
}

impl DispatchOutcome {
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Success { provider_id, .. } => Some(provider_id),
            DispatchOutcome::AllFailed { .. } => None,
        }
    }
}

/// Summarizes every branch failure for the job record.
pub fn describe_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "no transcription providers configured".to_string();
    }
    failures
        .iter()
        .map(|f| format!("{}: {}", f.provider_id, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct ProviderDispatcher {
    providers: Vec<Arc<dyn TranscriptionProvider>>,
    config: DispatchConfig,
}

impl ProviderDispatcher {
    pub fn new(providers: Vec<Arc<dyn TranscriptionProvider>>, config: DispatchConfig) -> Self {
        Self { providers, config }
    }

    pub fn provider_ids(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id().to_string()).collect()
    }

    pub async fn dispatch(&self, request: &TranscriptionRequest<'_>) -> DispatchOutcome {
        match self.config.mode {
            DispatchMode::Sequential => self.dispatch_sequential(request).await,
            DispatchMode::Concurrent => self.dispatch_concurrent(request).await,
        }
    }

    async fn dispatch_sequential(&self, request: &TranscriptionRequest<'_>) -> DispatchOutcome {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match self.run_branch(provider.as_ref(), request).await {
                Ok(result) => {
                    return DispatchOutcome::Success {
                        provider_id: provider.id().to_string(),
                        result,
                    };
                }
                Err(error) => {
                    self.log_branch_failure(provider.id(), request, &error);
                    failures.push(ProviderFailure {
                        provider_id: provider.id().to_string(),
                        error,
                    });
                }
            }
        }
        DispatchOutcome::AllFailed { failures }
    }

    async fn dispatch_concurrent(&self, request: &TranscriptionRequest<'_>) -> DispatchOutcome {
        let mut branches: FuturesUnordered<_> = self
            .providers
            .iter()
            .map(|provider| async move {
                let result = self.run_branch(provider.as_ref(), request).await;
                (provider.id().to_string(), result)
            })
            .collect();

        let mut failures = Vec::new();
        while let Some((provider_id, result)) = branches.next().await {
            match result {
                Ok(result) => {
                    // Dropping the remaining branches abandons their results.
                    return DispatchOutcome::Success {
                        provider_id,
                        result,
                    };
                }
                Err(error) => {
                    self.log_branch_failure(&provider_id, request, &error);
                    failures.push(ProviderFailure { provider_id, error });
                }
            }
        }
        DispatchOutcome::AllFailed { failures }
    }

    async fn run_branch(
        &self,
        provider: &dyn TranscriptionProvider,
        request: &TranscriptionRequest<'_>,
    ) -> Result<TranscriptionResult, ProviderError> {
        let timeout = Duration::from_secs(self.config.provider_timeout_secs);
        let mut result = tokio::time::timeout(timeout, self.submit_and_wait(provider, request))
            .await
            .map_err(|_| ProviderError::Timeout(self.config.provider_timeout_secs))??;

        if !result.is_well_formed() {
            return Err(ProviderError::InvalidResponse(
                "non-finite or negative timestamps".to_string(),
            ));
        }
        result.normalize();
        Ok(result)
    }

    async fn submit_and_wait(
        &self,
        provider: &dyn TranscriptionProvider,
        request: &TranscriptionRequest<'_>,
    ) -> Result<TranscriptionResult, ProviderError> {
        tracing::debug!(provider = provider.id(), "Submitting audio to provider");
        match provider.submit(request).await? {
            ProviderSubmission::Completed(result) => Ok(result),
            ProviderSubmission::Accepted(job_ref) => self.poll_provider(provider, &job_ref).await,
        }
    }

    async fn poll_provider(
        &self,
        provider: &dyn TranscriptionProvider,
        job_ref: &ProviderJobRef,
    ) -> Result<TranscriptionResult, ProviderError> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        for attempt in 1..=self.config.max_poll_attempts {
            tokio::time::sleep(interval).await;
            match provider.status(job_ref).await? {
                ProviderStatus::Completed(result) => return Ok(result),
                ProviderStatus::Failed(reason) => return Err(ProviderError::Rejected(reason)),
                ProviderStatus::Pending => {
                    tracing::trace!(provider = provider.id(), attempt, "Provider job pending");
                }
                ProviderStatus::Running { progress } => {
                    tracing::trace!(provider = provider.id(), attempt, ?progress, "Provider job running");
                }
            }
        }
        Err(ProviderError::PollingExhausted(self.config.max_poll_attempts))
    }

    fn log_branch_failure(
        &self,
        provider_id: &str,
        request: &TranscriptionRequest<'_>,
        error: &ProviderError,
    ) {
        tracing::warn!(
            provider = provider_id,
            job_id = %request.asset.job_id,
            source = %request.asset.source_reference,
            stage = "transcribing",
            error = %error,
            "Provider branch failed"
        );
    }
}
