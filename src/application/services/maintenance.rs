use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::admission::AdmissionController;
use super::audio_pipeline::AudioPipeline;

/// Periodically drops abuse observations older than the rolling window,
/// forgets idle rate counters and deletes audio assets whose URLs have expired.
pub async fn run_pruning(
    admission: Arc<AdmissionController>,
    audio: Arc<AudioPipeline>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        prune_once(&admission, &audio).await;
    }
    tracing::debug!("Pruning task stopped");
}

pub async fn prune_once(admission: &AdmissionController, audio: &AudioPipeline) {
    let now = Utc::now();
    match admission.abuse_detector().prune(now).await {
        Ok(removed) if removed > 0 => tracing::debug!(removed, "Pruned abuse records"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Abuse state pruning failed"),
    }
    match admission.rate_limiter().prune(now).await {
        Ok(removed) if removed > 0 => tracing::debug!(removed, "Pruned idle rate counters"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Rate counter pruning failed"),
    }
    let expired = audio.prune_expired(now).await;
    if expired > 0 {
        tracing::debug!(expired, "Released expired audio assets");
    }
}
