use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::application::ports::{ClipError, ClipParams, ClipWorker};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClipRequest<'a> {
    source_url: &'a str,
    target_seconds: u32,
    offset_seconds: u32,
}

/// Remote clipping worker reached over HTTP. Posts
/// `{sourceUrl, targetSeconds, offsetSeconds}` and reads the clipped audio
/// from the response body.
pub struct HttpClipWorker {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpClipWorker {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            timeout_secs: timeout_secs.max(1),
        }
    }
}

#[async_trait]
impl ClipWorker for HttpClipWorker {
    async fn clip(&self, source_url: &str, params: &ClipParams) -> Result<Vec<u8>, ClipError> {
        let body = ClipRequest {
            source_url,
            target_seconds: params.target_seconds,
            offset_seconds: params.offset_seconds,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(endpoint = %self.endpoint, "Requesting remote clip");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClipError::Timeout(self.timeout_secs)
            } else {
                ClipError::RequestFailed(format!("request: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ClipError::RequestFailed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClipError::RequestFailed(format!("body: {}", e)))?;
        if bytes.is_empty() {
            return Err(ClipError::EmptyOutput);
        }
        Ok(bytes.to_vec())
    }
}
