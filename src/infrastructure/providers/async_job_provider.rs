use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::ports::{
    ProviderError, ProviderJobRef, ProviderPhase, ProviderStatus, ProviderSubmission,
    TranscriptionProvider, TranscriptionRequest, map_provider_status,
};
use crate::domain::{AccuracyMode, Segment, TranscriptionResult, WordTiming};

/// REST provider that accepts an audio URL, returns a job id and is polled
/// until the transcript is ready.
///
/// `POST {base}/transcripts` with `{audio_url, language?, model}` answers
/// `{id, status}`; `GET {base}/transcripts/{id}` answers the status plus,
/// once completed, the transcript.
pub struct AsyncJobProvider {
    id: String,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: Option<String>,
    high_accuracy_model: Option<String>,
}

#[derive(Serialize)]
struct CreateTranscriptRequest<'a> {
    audio_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct TranscriptJob {
    id: String,
    status: String,
    #[serde(default)]
    progress: Option<u8>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<RemoteSegment>,
    #[serde(default)]
    words: Vec<RemoteWord>,
}

#[derive(Deserialize, Debug)]
struct RemoteSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    speaker: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Deserialize, Debug)]
struct RemoteWord {
    text: String,
    start: f64,
    end: f64,
}

impl AsyncJobProvider {
    pub fn new(
        id: impl Into<String>,
        base_url: &str,
        api_key: String,
        model: Option<String>,
        high_accuracy_model: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            high_accuracy_model,
        }
    }

    fn model_for(&self, accuracy: AccuracyMode) -> Option<&str> {
        match accuracy {
            AccuracyMode::Standard => self.model.as_deref(),
            AccuracyMode::High => self.high_accuracy_model.as_deref().or(self.model.as_deref()),
        }
    }

    async fn read_job(&self, response: reqwest::Response) -> Result<TranscriptJob, ProviderError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiRequestFailed(format!(
                "status {}: {}",
                status, body
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("parse response: {}", e)))
    }
}

fn into_result(job: TranscriptJob) -> TranscriptionResult {
    TranscriptionResult {
        text: job.text.unwrap_or_default(),
        segments: job
            .segments
            .into_iter()
            .map(|s| Segment {
                start: s.start,
                end: s.end,
                text: s.text,
                speaker: s.speaker,
                confidence: s.confidence,
            })
            .collect(),
        words: job
            .words
            .into_iter()
            .map(|w| WordTiming {
                start: w.start,
                end: w.end,
                text: w.text,
            })
            .collect(),
        language: job.language,
        duration_seconds: job.duration,
    }
}

#[async_trait]
impl TranscriptionProvider for AsyncJobProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn submit(
        &self,
        request: &TranscriptionRequest<'_>,
    ) -> Result<ProviderSubmission, ProviderError> {
        let body = CreateTranscriptRequest {
            audio_url: &request.asset.url,
            language: request.language,
            model: self.model_for(request.accuracy),
        };

        let response = self
            .client
            .post(format!("{}/transcripts", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::ApiRequestFailed(format!("request: {}", e)))?;
        let job = self.read_job(response).await?;

        tracing::debug!(provider = %self.id, external_id = %job.id, status = %job.status, "Provider accepted job");

        let job_ref = ProviderJobRef {
            provider_id: self.id.clone(),
            external_id: job.id.clone(),
        };
        match map_provider_status(&job.status) {
            Some(ProviderPhase::Completed) => Ok(ProviderSubmission::Completed(into_result(job))),
            Some(ProviderPhase::Failed) => Err(ProviderError::Rejected(
                job.error.unwrap_or_else(|| job.status.clone()),
            )),
            Some(ProviderPhase::Pending | ProviderPhase::Running) => {
                Ok(ProviderSubmission::Accepted(job_ref))
            }
            None => Err(ProviderError::InvalidResponse(format!(
                "unknown status: {}",
                job.status
            ))),
        }
    }

    async fn status(&self, job_ref: &ProviderJobRef) -> Result<ProviderStatus, ProviderError> {
        let response = self
            .client
            .get(format!("{}/transcripts/{}", self.base_url, job_ref.external_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::ApiRequestFailed(format!("request: {}", e)))?;
        let job = self.read_job(response).await?;

        match map_provider_status(&job.status) {
            Some(ProviderPhase::Pending) => Ok(ProviderStatus::Pending),
            Some(ProviderPhase::Running) => Ok(ProviderStatus::Running {
                progress: job.progress.map(|p| p.min(100)),
            }),
            Some(ProviderPhase::Completed) => Ok(ProviderStatus::Completed(into_result(job))),
            Some(ProviderPhase::Failed) => Ok(ProviderStatus::Failed(
                job.error.unwrap_or_else(|| job.status.clone()),
            )),
            None => Err(ProviderError::InvalidResponse(format!(
                "unknown status: {}",
                job.status
            ))),
        }
    }
}
