use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, RANGE};

use crate::application::ports::{FetchedMedia, MediaFetcher, ResolveError};
use crate::infrastructure::observability::sanitize_reference;

/// Range-requests the first `max_bytes` of a URL. Servers that ignore the
/// range are cut off at the same limit while streaming.
pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| ResolveError::FetchFailed(format!("client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str, max_bytes: u64) -> Result<FetchedMedia, ResolveError> {
        let range = format!("bytes=0-{}", max_bytes.saturating_sub(1));
        let mut response = self
            .client
            .get(url)
            .header(RANGE, range)
            .send()
            .await
            .map_err(|e| ResolveError::FetchFailed(format!("request: {}", e)))?;

        match response.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {}
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                return Err(ResolveError::NotFound(sanitize_reference(url)));
            }
            status => {
                return Err(ResolveError::FetchFailed(format!("status {}", status)));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let mut buffer = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ResolveError::FetchFailed(format!("body: {}", e)))?
        {
            let room = (max_bytes as usize).saturating_sub(buffer.len());
            buffer.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if buffer.len() as u64 >= max_bytes {
                tracing::debug!(url = %sanitize_reference(url), max_bytes, "Fetch truncated at byte limit");
                break;
            }
        }

        Ok(FetchedMedia {
            bytes: buffer.freeze(),
            content_type,
        })
    }
}
