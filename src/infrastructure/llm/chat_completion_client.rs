use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::application::ports::{LlmClient, LlmClientError};
use crate::presentation::config::{LlmProvider, LlmSettings};

const AZURE_API_VERSION: &str = "2024-06-01";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_ERROR_BODY: usize = 300;

enum Credential {
    Bearer(String),
    AzureKey(String),
}

/// Chat completions over OpenAI, Azure OpenAI or any OpenAI-compatible
/// server. The endpoint and credential style are fixed at construction.
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    credential: Credential,
    model: String,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Turn<'a>; 2],
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Reply,
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionClient {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            Credential::Bearer(key) => request.bearer_auth(key),
            Credential::AzureKey(key) => request.header("api-key", key),
        }
    }
}

#[async_trait]
impl LlmClient for ChatCompletionClient {
    async fn complete(&self, instruction: &str, text: &str) -> Result<String, LlmClientError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: [
                Turn {
                    role: "system",
                    content: instruction,
                },
                Turn {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .authorize(self.client.post(&self.endpoint).json(&body))
            .send()
            .await
            .map_err(|e| match e.is_timeout() {
                true => LlmClientError::Timeout,
                false => LlmClientError::ApiRequestFailed(e.to_string()),
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmClientError::RateLimited);
        }
        if !status.is_success() {
            let detail: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(LlmClientError::ApiRequestFailed(format!(
                "status {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::InvalidResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LlmClientError::InvalidResponse("no completion content".to_string()))
    }
}

fn required<'a>(value: Option<&'a String>, field: &str) -> Result<&'a str, LlmClientError> {
    value
        .map(|v| v.trim_end_matches('/'))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LlmClientError::Misconfigured(format!("llm.{} is required", field)))
}

pub fn create_chat_client(settings: &LlmSettings) -> Result<ChatCompletionClient, LlmClientError> {
    let (endpoint, credential) = match settings.provider {
        LlmProvider::OpenAi => {
            let base = settings
                .base_url
                .as_deref()
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/');
            (
                format!("{}/chat/completions", base),
                Credential::Bearer(settings.api_key.clone()),
            )
        }
        LlmProvider::Compatible => (
            format!(
                "{}/chat/completions",
                required(settings.base_url.as_ref(), "base_url")?
            ),
            Credential::Bearer(settings.api_key.clone()),
        ),
        LlmProvider::Azure => (
            format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                required(settings.azure_endpoint.as_ref(), "azure_endpoint")?,
                settings.chat_model,
                AZURE_API_VERSION
            ),
            Credential::AzureKey(settings.api_key.clone()),
        ),
    };

    let client = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
        .build()
        .map_err(|e| LlmClientError::Misconfigured(e.to_string()))?;

    Ok(ChatCompletionClient {
        client,
        endpoint,
        credential,
        model: settings.chat_model.clone(),
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
    })
}
