use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{PollResponse, StatusSource, StatusSourceError};
use crate::domain::JobId;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            max_attempts: 150,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The job reached `completed` or `failed`.
    Finished(PollResponse),
    /// The attempt budget ran out before the job finished.
    Exhausted {
        attempts: u32,
        last: Option<PollResponse>,
    },
    /// The caller stopped polling. The job itself is untouched.
    Cancelled { last: Option<PollResponse> },
}

/// Bounded, cooperatively cancellable status polling. Total wait never
/// exceeds `max_attempts × interval` plus the time spent in each poll.
pub struct JobPoller {
    source: Arc<dyn StatusSource>,
    config: PollConfig,
}

impl JobPoller {
    pub fn new(source: Arc<dyn StatusSource>, config: PollConfig) -> Self {
        Self { source, config }
    }

    pub async fn poll_until_done(
        &self,
        job_id: JobId,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, StatusSourceError> {
        let interval = Duration::from_millis(self.config.interval_ms);
        let mut last: Option<PollResponse> = None;

        for attempt in 1..=self.config.max_attempts {
            if cancel.is_cancelled() {
                return Ok(PollOutcome::Cancelled { last });
            }

            let polled = tokio::select! {
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled { last }),
                polled = self.source.poll(job_id) => polled,
            };

            match polled {
                Ok(response) => {
                    tracing::trace!(
                        job_id = %job_id,
                        attempt,
                        status = %response.status,
                        progress = response.progress,
                        "Polled job status"
                    );
                    if response.status.is_terminal() {
                        return Ok(PollOutcome::Finished(response));
                    }
                    last = Some(response);
                }
                Err(StatusSourceError::NotFound(id)) => return Err(StatusSourceError::NotFound(id)),
                Err(e) => {
                    tracing::warn!(job_id = %job_id, attempt, error = %e, "Status poll failed");
                }
            }

            if attempt < self.config.max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled { last }),
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }

        Ok(PollOutcome::Exhausted {
            attempts: self.config.max_attempts,
            last,
        })
    }
}
