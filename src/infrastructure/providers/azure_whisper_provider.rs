use async_trait::async_trait;
use reqwest::multipart;

use crate::application::ports::{
    ProviderError, ProviderSubmission, TranscriptionProvider, TranscriptionRequest,
};
use crate::domain::{AccuracyMode, TranscriptionResult};

use super::whisper_response::VerboseTranscription;

/// Azure OpenAI Whisper deployment. High-accuracy jobs may be routed to a
/// second deployment.
pub struct AzureWhisperProvider {
    id: String,
    client: reqwest::Client,
    endpoint: String,
    high_accuracy_endpoint: String,
    api_key: String,
}

impl AzureWhisperProvider {
    pub fn new(
        id: impl Into<String>,
        base_url: &str,
        deployment: &str,
        high_accuracy_deployment: Option<&str>,
        api_key: &str,
        api_version: &str,
    ) -> Self {
        let endpoint_for = |deployment: &str| {
            format!(
                "{}/openai/deployments/{}/audio/transcriptions?api-version={}",
                base_url.trim_end_matches('/'),
                deployment,
                api_version,
            )
        };
        Self {
            id: id.into(),
            client: reqwest::Client::new(),
            endpoint: endpoint_for(deployment),
            high_accuracy_endpoint: endpoint_for(high_accuracy_deployment.unwrap_or(deployment)),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for AzureWhisperProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn submit(
        &self,
        request: &TranscriptionRequest<'_>,
    ) -> Result<ProviderSubmission, ProviderError> {
        let endpoint = match request.accuracy {
            AccuracyMode::Standard => &self.endpoint,
            AccuracyMode::High => &self.high_accuracy_endpoint,
        };

        let file_part = multipart::Part::bytes(request.audio.to_vec())
            .file_name(format!("audio.{}", request.asset.extension()))
            .mime_str(&request.asset.content_type)
            .map_err(|e| ProviderError::ApiRequestFailed(format!("mime: {}", e)))?;

        let mut form = multipart::Form::new()
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .text("timestamp_granularities[]", "word")
            .part("file", file_part);
        if let Some(language) = request.language {
            form = form.text("language", language.to_string());
        }

        tracing::debug!(provider = %self.id, endpoint = %endpoint, "Sending audio to Azure OpenAI Whisper");

        let response = self
            .client
            .post(endpoint)
            .header("api-key", &self.api_key)
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
            "Azure OpenAI Whisper transcription completed"
        );

        Ok(ProviderSubmission::Completed(result))
    }
}
