use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::application::ports::{
    AudioProbe, BlobStore, BlobStoreError, ClipError, ClipParams, ClipWorker, LocalTranscoder,
    MediaFetcher, PlatformResolver, ResolveError,
};
use crate::domain::{
    AudioAsset, JobId, SourceDescriptor, SourceKind, StoragePath, content_type_for_extension,
    extension_for_content_type,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioPipelineConfig {
    pub local_transcoding_enabled: bool,
    pub remote_worker_enabled: bool,
    /// Hand the unclipped asset on when every clipping stage failed.
    pub allow_passthrough: bool,
    pub max_fetch_bytes: u64,
    pub asset_ttl_secs: u64,
    /// Clip length applied to free-tier jobs that did not ask for less.
    pub preview_max_seconds: u32,
}

impl Default for AudioPipelineConfig {
    fn default() -> Self {
        Self {
            local_transcoding_enabled: true,
            remote_worker_enabled: true,
            allow_passthrough: false,
            max_fetch_bytes: 200 * 1024 * 1024,
            asset_ttl_secs: 3600,
            preview_max_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipStage {
    NotNeeded,
    Local,
    Remote,
    Passthrough,
}

impl ClipStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipStage::NotNeeded => "not_needed",
            ClipStage::Local => "local",
            ClipStage::Remote => "remote",
            ClipStage::Passthrough => "passthrough",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClippedAudio {
    pub asset: AudioAsset,
    pub stage: ClipStage,
}

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("source unresolvable: {0}")]
    Unresolvable(#[from] ResolveError),
    #[error("storage: {0}")]
    Storage(#[from] BlobStoreError),
    #[error("all clipping stages failed: {0}")]
    ClippingExhausted(String),
}

pub struct AudioPipeline {
    blob_store: Arc<dyn BlobStore>,
    fetcher: Arc<dyn MediaFetcher>,
    resolvers: Vec<Arc<dyn PlatformResolver>>,
    transcoder: Option<Arc<dyn LocalTranscoder>>,
    clip_worker: Option<Arc<dyn ClipWorker>>,
    probe: Arc<dyn AudioProbe>,
    config: AudioPipelineConfig,
    live: Mutex<HashMap<JobId, AudioAsset>>,
}

impl AudioPipeline {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        fetcher: Arc<dyn MediaFetcher>,
        probe: Arc<dyn AudioProbe>,
        config: AudioPipelineConfig,
    ) -> Self {
        Self {
            blob_store,
            fetcher,
            resolvers: Vec::new(),
            transcoder: None,
            clip_worker: None,
            probe,
            config,
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn PlatformResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn LocalTranscoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    pub fn with_clip_worker(mut self, clip_worker: Arc<dyn ClipWorker>) -> Self {
        self.clip_worker = Some(clip_worker);
        self
    }

    pub fn config(&self) -> &AudioPipelineConfig {
        &self.config
    }

    #[tracing::instrument(skip(self, source), fields(job_id = %job_id, source_kind = %source.kind))]
    pub async fn resolve_audio(
        &self,
        job_id: JobId,
        source: &SourceDescriptor,
    ) -> Result<AudioAsset, AcquisitionError> {
        let asset = self.acquire(job_id, source).await?;
        self.track(asset.clone()).await;
        Ok(asset)
    }

    async fn acquire(
        &self,
        job_id: JobId,
        source: &SourceDescriptor,
    ) -> Result<AudioAsset, AcquisitionError> {
        match source.kind {
            SourceKind::StoredFile => self.resolve_stored(job_id, &source.reference).await,
            SourceKind::RemoteUrl => {
                let media = self
                    .fetcher
                    .fetch(&source.reference, self.config.max_fetch_bytes)
                    .await?;
                self.persist(job_id, &source.reference, media.bytes, media.content_type)
                    .await
            }
            SourceKind::Platform => {
                let resolver = self
                    .resolvers
                    .iter()
                    .find(|r| r.supports(&source.reference))
                    .ok_or_else(|| ResolveError::Unsupported(source.reference.clone()))?;
                let stream_url = resolver.resolve_stream_url(&source.reference).await?;
                tracing::debug!(resolver = resolver.name(), "Platform stream URL resolved");
                // The stream URL expires quickly; persist before anything else reads it.
                let media = self
                    .fetcher
                    .fetch(&stream_url, self.config.max_fetch_bytes)
                    .await?;
                self.persist(job_id, &source.reference, media.bytes, media.content_type)
                    .await
            }
        }
    }

    /// Probed duration of a stored upload, used to size quota reservations
    /// before the job runs.
    pub async fn stored_duration(&self, reference: &str) -> Option<f64> {
        let data = self
            .blob_store
            .fetch(&StoragePath::from_raw(reference))
            .await
            .ok()?;
        self.probe_duration(&data)
    }

    async fn resolve_stored(
        &self,
        job_id: JobId,
        reference: &str,
    ) -> Result<AudioAsset, AcquisitionError> {
        let path = StoragePath::from_raw(reference);
        self.blob_store
            .head(&path)
            .await
            .map_err(|e| AcquisitionError::SourceUnavailable(format!("{}: {}", reference, e)))?;
        let data = self.blob_store.fetch(&path).await?;
        let extension = reference.rsplit_once('.').map(|(_, e)| e).unwrap_or("bin");

        Ok(AudioAsset {
            job_id,
            url: self.blob_store.public_url(&path, self.ttl())?,
            path,
            source_reference: reference.to_string(),
            content_type: content_type_for_extension(extension).to_string(),
            duration_seconds: self.probe_duration(&data),
            clipped: false,
            owned: false,
            expires_at: Utc::now() + TimeDelta::seconds(self.config.asset_ttl_secs as i64),
        })
    }

    async fn persist(
        &self,
        job_id: JobId,
        reference: &str,
        bytes: Bytes,
        content_type: Option<String>,
    ) -> Result<AudioAsset, AcquisitionError> {
        if bytes.is_empty() {
            return Err(AcquisitionError::SourceUnavailable(format!(
                "{}: empty response",
                reference
            )));
        }
        let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
        let extension = extension_for_content_type(&content_type);
        let path = StoragePath::job_audio(&job_id, &format!("source.{}", extension));
        let duration_seconds = self.probe_duration(&bytes);

        let size = self.blob_store.put(&path, bytes).await?;
        tracing::debug!(path = %path, bytes = size, "Source audio persisted");

        Ok(AudioAsset {
            job_id,
            url: self.blob_store.public_url(&path, self.ttl())?,
            path,
            source_reference: reference.to_string(),
            content_type,
            duration_seconds,
            clipped: false,
            owned: true,
            expires_at: Utc::now() + TimeDelta::seconds(self.config.asset_ttl_secs as i64),
        })
    }

    /// Truncates `asset` to `max_seconds` starting at `offset_seconds`.
    /// Tries the local transcoder, then the remote worker, then (only if
    /// configured) passes the original through. Each stage runs once.
    #[tracing::instrument(skip(self, asset), fields(job_id = %asset.job_id))]
    pub async fn clip(
        &self,
        asset: AudioAsset,
        max_seconds: u32,
        offset_seconds: u32,
    ) -> Result<ClippedAudio, AcquisitionError> {
        if offset_seconds == 0
            && asset
                .duration_seconds
                .is_some_and(|d| d <= f64::from(max_seconds))
        {
            return Ok(ClippedAudio {
                asset,
                stage: ClipStage::NotNeeded,
            });
        }

        let params = ClipParams {
            target_seconds: max_seconds,
            offset_seconds,
        };
        let mut failures: Vec<String> = Vec::new();

        match self.clip_locally(&asset, &params).await {
            Ok(bytes) => return self.store_clip(asset, bytes, ClipStage::Local, &params).await,
            Err(e) => {
                self.log_stage_failure(&asset, &params, ClipStage::Local, &e);
                failures.push(format!("local: {}", e));
            }
        }

        match self.clip_remotely(&asset, &params).await {
            Ok(bytes) => return self.store_clip(asset, bytes, ClipStage::Remote, &params).await,
            Err(e) => {
                self.log_stage_failure(&asset, &params, ClipStage::Remote, &e);
                failures.push(format!("remote: {}", e));
            }
        }

        if self.config.allow_passthrough {
            tracing::warn!(
                source = %asset.source_reference,
                target_seconds = params.target_seconds,
                offset_seconds = params.offset_seconds,
                "Clipping failed, passing unclipped audio through"
            );
            return Ok(ClippedAudio {
                asset,
                stage: ClipStage::Passthrough,
            });
        }

        tracing::error!(
            source = %asset.source_reference,
            target_seconds = params.target_seconds,
            offset_seconds = params.offset_seconds,
            "All clipping stages failed"
        );
        Err(AcquisitionError::ClippingExhausted(failures.join("; ")))
    }

    async fn clip_locally(
        &self,
        asset: &AudioAsset,
        params: &ClipParams,
    ) -> Result<Vec<u8>, ClipError> {
        let transcoder = match (&self.transcoder, self.config.local_transcoding_enabled) {
            (Some(t), true) => t,
            _ => return Err(ClipError::Disabled),
        };
        let audio = self
            .blob_store
            .fetch(&asset.path)
            .await
            .map_err(|e| ClipError::ProcessFailed(format!("load source: {}", e)))?;
        let clipped = transcoder.clip(&audio, params).await?;
        non_empty(clipped)
    }

    async fn clip_remotely(
        &self,
        asset: &AudioAsset,
        params: &ClipParams,
    ) -> Result<Vec<u8>, ClipError> {
        let worker = match (&self.clip_worker, self.config.remote_worker_enabled) {
            (Some(w), true) => w,
            _ => return Err(ClipError::Disabled),
        };
        let clipped = worker.clip(&asset.url, params).await?;
        non_empty(clipped)
    }

    async fn store_clip(
        &self,
        original: AudioAsset,
        bytes: Vec<u8>,
        stage: ClipStage,
        params: &ClipParams,
    ) -> Result<ClippedAudio, AcquisitionError> {
        let path = StoragePath::job_audio(&original.job_id, "clip.wav");
        let duration_seconds = self.probe_duration(&bytes).or_else(|| {
            original.duration_seconds.map(|d| {
                (d - f64::from(params.offset_seconds))
                    .clamp(0.0, f64::from(params.target_seconds))
            })
        });
        self.blob_store.put(&path, Bytes::from(bytes)).await?;

        let clipped = AudioAsset {
            job_id: original.job_id,
            url: self.blob_store.public_url(&path, self.ttl())?,
            path,
            source_reference: original.source_reference.clone(),
            content_type: "audio/wav".to_string(),
            duration_seconds,
            clipped: true,
            owned: true,
            expires_at: Utc::now() + TimeDelta::seconds(self.config.asset_ttl_secs as i64),
        };

        // One live asset per job: the superseded intermediate goes away.
        if original.path != clipped.path {
            self.release(&original).await;
        }
        self.track(clipped.clone()).await;

        tracing::info!(
            stage = stage.as_str(),
            target_seconds = params.target_seconds,
            offset_seconds = params.offset_seconds,
            "Audio clipped"
        );
        Ok(ClippedAudio {
            asset: clipped,
            stage,
        })
    }

    pub async fn load(&self, asset: &AudioAsset) -> Result<Vec<u8>, AcquisitionError> {
        Ok(self.blob_store.fetch(&asset.path).await?)
    }

    /// Deletes a job-owned asset. Uploaded originals are left alone.
    pub async fn release(&self, asset: &AudioAsset) {
        {
            let mut live = self.live.lock().await;
            if live.get(&asset.job_id).is_some_and(|a| a.path == asset.path) {
                live.remove(&asset.job_id);
            }
        }
        self.delete_owned(asset).await;
    }

    /// The asset currently held for `job_id`, if any.
    pub async fn live_asset(&self, job_id: JobId) -> Option<AudioAsset> {
        self.live.lock().await.get(&job_id).cloned()
    }

    /// Drops every tracked asset whose URL lifetime has passed.
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<AudioAsset> = {
            let mut live = self.live.lock().await;
            let ids: Vec<JobId> = live
                .iter()
                .filter(|(_, asset)| asset.is_expired(now))
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| live.remove(id)).collect()
        };
        for asset in &expired {
            self.delete_owned(asset).await;
        }
        expired.len()
    }

    async fn track(&self, asset: AudioAsset) {
        self.live.lock().await.insert(asset.job_id, asset);
    }

    async fn delete_owned(&self, asset: &AudioAsset) {
        if !asset.owned {
            return;
        }
        if let Err(e) = self.blob_store.delete(&asset.path).await {
            tracing::warn!(error = %e, path = %asset.path, "Failed to delete audio asset");
        }
    }

    fn log_stage_failure(
        &self,
        asset: &AudioAsset,
        params: &ClipParams,
        stage: ClipStage,
        error: &ClipError,
    ) {
        if matches!(error, ClipError::Disabled) {
            tracing::debug!(stage = stage.as_str(), "Clipping stage disabled, skipping");
            return;
        }
        tracing::warn!(
            stage = stage.as_str(),
            source = %asset.source_reference,
            target_seconds = params.target_seconds,
            offset_seconds = params.offset_seconds,
            error = %error,
            "Clipping stage failed"
        );
    }

    fn probe_duration(&self, data: &[u8]) -> Option<f64> {
        match self.probe.duration_seconds(data) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::debug!(error = %e, "Audio duration probe failed");
                None
            }
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.asset_ttl_secs)
    }
}

fn non_empty(bytes: Vec<u8>) -> Result<Vec<u8>, ClipError> {
    if bytes.is_empty() {
        Err(ClipError::EmptyOutput)
    } else {
        Ok(bytes)
    }
}
