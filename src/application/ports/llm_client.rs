use async_trait::async_trait;

/// Chat-style completion used to repair punctuation in transcript text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends `instruction` as the system turn and `text` as the user turn,
    /// returning the model's reply verbatim.
    async fn complete(&self, instruction: &str, text: &str) -> Result<String, LlmClientError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmClientError {
    #[error("completion request failed: {0}")]
    ApiRequestFailed(String),
    #[error("completion request timed out")]
    Timeout,
    #[error("completion endpoint rate limited")]
    RateLimited,
    #[error("unusable completion: {0}")]
    InvalidResponse(String),
    #[error("llm client misconfigured: {0}")]
    Misconfigured(String),
}
