use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::application::ports::{PlatformResolver, ResolveError};
use crate::infrastructure::observability::sanitize_reference;

#[derive(Deserialize)]
struct ResolveResponse {
    #[serde(alias = "url")]
    stream_url: String,
}

/// Delegates platform references (video pages, podcast episodes) to an
/// extraction service that answers `GET {endpoint}?url=...` with a
/// short-lived direct stream URL.
pub struct HttpPlatformResolver {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    hosts: Vec<String>,
}

impl HttpPlatformResolver {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, hosts: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: name.into(),
            endpoint: endpoint.into(),
            hosts: hosts.into_iter().map(|h| h.to_lowercase()).collect(),
        }
    }
}

fn host_of(reference: &str) -> Option<String> {
    let rest = reference.split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?;
    Some(host.to_lowercase())
}

#[async_trait]
impl PlatformResolver for HttpPlatformResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, reference: &str) -> bool {
        let Some(host) = host_of(reference) else {
            return false;
        };
        self.hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
    }

    async fn resolve_stream_url(&self, reference: &str) -> Result<String, ResolveError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", reference)])
            .send()
            .await
            .map_err(|e| ResolveError::ResolverFailed(format!("request: {}", e)))?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(ResolveError::NotFound(reference.to_string())),
            status => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown error".to_string());
                return Err(ResolveError::ResolverFailed(format!(
                    "status {}: {}",
                    status, body
                )));
            }
        }

        let resolved: ResolveResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::ResolverFailed(format!("parse response: {}", e)))?;
        if resolved.stream_url.trim().is_empty() {
            return Err(ResolveError::ResolverFailed("empty stream url".to_string()));
        }
        tracing::debug!(
            resolver = %self.name,
            stream_url = %sanitize_reference(&resolved.stream_url),
            "Resolved platform stream"
        );
        Ok(resolved.stream_url)
    }
}
