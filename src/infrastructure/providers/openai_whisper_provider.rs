use async_trait::async_trait;
use reqwest::multipart;

use crate::application::ports::{
    ProviderError, ProviderSubmission, TranscriptionProvider, TranscriptionRequest,
};
use crate::domain::{AccuracyMode, TranscriptionResult};

use super::whisper_response::VerboseTranscription;

/// OpenAI-compatible `/audio/transcriptions` endpoint. Answers in the
/// submit call.
pub struct OpenAiWhisperProvider {
    id: String,
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    high_accuracy_model: String,
}

impl OpenAiWhisperProvider {
    pub fn new(
        id: impl Into<String>,
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
        high_accuracy_model: Option<String>,
    ) -> Self {
        let model = model.unwrap_or_else(|| "whisper-1".to_string());
        Self {
            id: id.into(),
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            high_accuracy_model: high_accuracy_model.unwrap_or_else(|| model.clone()),
            model,
        }
    }

    fn model_for(&self, accuracy: AccuracyMode) -> &str {
        match accuracy {
            AccuracyMode::Standard => &self.model,
            AccuracyMode::High => &self.high_accuracy_model,
        }
    }
}

#[async_trait]
impl TranscriptionProvider for OpenAiWhisperProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn submit(
        &self,
        request: &TranscriptionRequest<'_>,
    ) -> Result<ProviderSubmission, ProviderError> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let model = self.model_for(request.accuracy);

        let file_part = multipart::Part::bytes(request.audio.to_vec())
            .file_name(format!("audio.{}", request.asset.extension()))
            .mime_str(&request.asset.content_type)
            .map_err(|e| ProviderError::ApiRequestFailed(format!("mime: {}", e)))?;

        let mut form = multipart::Form::new()
            .text("model", model.to_string())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .text("timestamp_granularities[]", "word")
            .part("file", file_part);
        if let Some(language) = request.language {
            form = form.text("language", language.to_string());
        }

        tracing::debug!(provider = %self.id, model, "Sending audio to Whisper API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::ApiRequestFailed(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProviderError::ApiRequestFailed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let body: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("parse response: {}", e)))?;
        let result = TranscriptionResult::from(body);

        tracing::info!(
            provider = %self.id,
            chars = result.text.len(),
            segments = result.segments.len(),
            "Whisper transcription completed"
        );

        Ok(ProviderSubmission::Completed(result))
    }
}
