use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeDelta, Utc};

use scribeline::application::ports::{
    AudioProbe, ClipError, ClipParams, ClipWorker, FetchedMedia, LlmClient, LlmClientError,
    LocalTranscoder, MediaFetcher, PlatformResolver, ProbeError, ProviderError, ProviderJobRef,
    ProviderStatus, ProviderSubmission, ResolveError, TranscriptionProvider, TranscriptionRequest,
};
use scribeline::domain::{AudioAsset, JobId, Segment, StoragePath, TranscriptionResult};
use scribeline::infrastructure::storage::{ObjectBlobStore, UrlSigner};

pub const TEST_BLOB_BASE: &str = "http://localhost:3000/blobs";
pub const TEST_URL_SECRET: &str = "test-secret";

pub fn test_signer() -> UrlSigner {
    UrlSigner::new(TEST_BLOB_BASE, TEST_URL_SECRET).unwrap()
}

pub fn memory_blob_store() -> Arc<ObjectBlobStore> {
    Arc::new(ObjectBlobStore::in_memory(test_signer()))
}

/// A job-owned asset as the pipeline would hand it to providers.
pub fn sample_asset() -> AudioAsset {
    let job_id = JobId::new();
    let path = StoragePath::job_audio(&job_id, "source.wav");
    AudioAsset {
        job_id,
        url: format!("{}/{}", TEST_BLOB_BASE, path),
        path,
        source_reference: "https://media.example/talk.wav".to_string(),
        content_type: "audio/wav".to_string(),
        duration_seconds: Some(42.0),
        clipped: false,
        owned: true,
        expires_at: Utc::now() + TimeDelta::hours(1),
    }
}

pub fn result_with(language: &str, segments: Vec<Segment>) -> TranscriptionResult {
    TranscriptionResult {
        text: String::new(),
        segments,
        words: Vec::new(),
        language: Some(language.to_string()),
        duration_seconds: None,
    }
}

pub fn english_result(text: &str) -> TranscriptionResult {
    result_with("en", vec![Segment::new(0.0, 2.5, text)])
}

/// Reports a fixed duration for any input, or fails when none is set.
pub struct FixedProbe(pub Option<f64>);

impl AudioProbe for FixedProbe {
    fn duration_seconds(&self, _data: &[u8]) -> Result<f64, ProbeError> {
        self.0
            .ok_or_else(|| ProbeError::UnknownFormat("test probe".to_string()))
    }
}

pub struct StaticFetcher {
    body: Bytes,
    content_type: Option<String>,
    pub requested: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new(body: &'static [u8], content_type: Option<&str>) -> Self {
        Self {
            body: Bytes::from_static(body),
            content_type: content_type.map(str::to_string),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, _max_bytes: u64) -> Result<FetchedMedia, ResolveError> {
        self.requested.lock().unwrap().push(url.to_string());
        Ok(FetchedMedia {
            bytes: self.body.clone(),
            content_type: self.content_type.clone(),
        })
    }
}

pub struct MissingFetcher;

#[async_trait]
impl MediaFetcher for MissingFetcher {
    async fn fetch(&self, url: &str, _max_bytes: u64) -> Result<FetchedMedia, ResolveError> {
        Err(ResolveError::NotFound(url.to_string()))
    }
}

pub struct StubResolver {
    pub host: &'static str,
    pub stream_url: &'static str,
}

#[async_trait]
impl PlatformResolver for StubResolver {
    fn name(&self) -> &str {
        "stub"
    }

    fn supports(&self, reference: &str) -> bool {
        reference.contains(self.host)
    }

    async fn resolve_stream_url(&self, _reference: &str) -> Result<String, ResolveError> {
        Ok(self.stream_url.to_string())
    }
}

pub struct StubTranscoder {
    output: Result<Vec<u8>, String>,
    pub calls: AtomicUsize,
}

impl StubTranscoder {
    pub fn succeeding(output: &[u8]) -> Self {
        Self {
            output: Ok(output.to_vec()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            output: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalTranscoder for StubTranscoder {
    async fn clip(&self, _audio: &[u8], _params: &ClipParams) -> Result<Vec<u8>, ClipError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone().map_err(ClipError::ProcessFailed)
    }
}

pub struct StubClipWorker {
    output: Result<Vec<u8>, String>,
    pub calls: Mutex<Vec<(String, ClipParams)>>,
}

impl StubClipWorker {
    pub fn succeeding(output: &[u8]) -> Self {
        Self {
            output: Ok(output.to_vec()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            output: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, ClipParams)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClipWorker for StubClipWorker {
    async fn clip(&self, source_url: &str, params: &ClipParams) -> Result<Vec<u8>, ClipError> {
        self.calls
            .lock()
            .unwrap()
            .push((source_url.to_string(), *params));
        self.output.clone().map_err(ClipError::RequestFailed)
    }
}

/// Answers every submit after `delay` with a fixed result or error.
pub struct ScriptedProvider {
    id: String,
    delay: Duration,
    outcome: Result<TranscriptionResult, String>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn succeeding(id: &str, delay: Duration, result: TranscriptionResult) -> Self {
        Self {
            id: id.to_string(),
            delay,
            outcome: Ok(result),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(id: &str, delay: Duration, message: &str) -> Self {
        Self {
            id: id.to_string(),
            delay,
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn submit(
        &self,
        _request: &TranscriptionRequest<'_>,
    ) -> Result<ProviderSubmission, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.outcome {
            Ok(result) => Ok(ProviderSubmission::Completed(result.clone())),
            Err(message) => Err(ProviderError::ApiRequestFailed(message.clone())),
        }
    }
}

/// Accepts the job and then reports the queued statuses in order; reports
/// pending once they run out.
pub struct PollingProvider {
    id: String,
    statuses: Mutex<VecDeque<ProviderStatus>>,
    pub polls: AtomicUsize,
}

impl PollingProvider {
    pub fn new(id: &str, statuses: Vec<ProviderStatus>) -> Self {
        Self {
            id: id.to_string(),
            statuses: Mutex::new(statuses.into()),
            polls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for PollingProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn submit(
        &self,
        _request: &TranscriptionRequest<'_>,
    ) -> Result<ProviderSubmission, ProviderError> {
        Ok(ProviderSubmission::Accepted(ProviderJobRef {
            provider_id: self.id.clone(),
            external_id: "ext-1".to_string(),
        }))
    }

    async fn status(&self, _job_ref: &ProviderJobRef) -> Result<ProviderStatus, ProviderError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ProviderStatus::Pending))
    }
}

/// Returns a canned completion and records the text it was asked about.
pub struct CannedLlm {
    answer: Result<String, ()>,
    pub prompts: Mutex<Vec<String>>,
}

impl CannedLlm {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn rate_limited() -> Self {
        Self {
            answer: Err(()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmClient for CannedLlm {
    async fn complete(&self, _prompt: &str, context: &str) -> Result<String, LlmClientError> {
        self.prompts.lock().unwrap().push(context.to_string());
        self.answer.clone().map_err(|_| LlmClientError::RateLimited)
    }
}
