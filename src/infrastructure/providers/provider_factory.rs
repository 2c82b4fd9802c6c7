use std::sync::Arc;

use crate::application::ports::{ProviderError, TranscriptionProvider};
use crate::presentation::config::{ProviderKind, ProviderSettings};

use super::async_job_provider::AsyncJobProvider;
use super::azure_whisper_provider::AzureWhisperProvider;
use super::openai_whisper_provider::OpenAiWhisperProvider;

pub struct ProviderFactory;

impl ProviderFactory {
    /// Builds enabled providers in configured order. Order matters for
    /// sequential dispatch.
    pub fn create_all(
        settings: &[ProviderSettings],
    ) -> Result<Vec<Arc<dyn TranscriptionProvider>>, ProviderError> {
        settings
            .iter()
            .filter(|s| s.enabled)
            .map(Self::create)
            .collect()
    }

    pub fn create(
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn TranscriptionProvider>, ProviderError> {
        if settings.id.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "provider id must not be empty".to_string(),
            ));
        }
        match settings.kind {
            ProviderKind::OpenAiWhisper => {
                let key = required(&settings.api_key, &settings.id, "api_key")?;
                Ok(Arc::new(OpenAiWhisperProvider::new(
                    settings.id.clone(),
                    key.to_string(),
                    settings.base_url.clone(),
                    settings.model.clone(),
                    settings.high_accuracy_model.clone(),
                )))
            }
            ProviderKind::AzureWhisper => {
                let key = required(&settings.api_key, &settings.id, "api_key")?;
                let base_url = required(&settings.base_url, &settings.id, "base_url")?;
                let deployment = required(&settings.model, &settings.id, "model")?;
                Ok(Arc::new(AzureWhisperProvider::new(
                    settings.id.clone(),
                    base_url,
                    deployment,
                    settings.high_accuracy_model.as_deref(),
                    key,
                    &settings.api_version,
                )))
            }
            ProviderKind::AsyncJob => {
                let key = required(&settings.api_key, &settings.id, "api_key")?;
                let base_url = required(&settings.base_url, &settings.id, "base_url")?;
                Ok(Arc::new(AsyncJobProvider::new(
                    settings.id.clone(),
                    base_url,
                    key.to_string(),
                    settings.model.clone(),
                    settings.high_accuracy_model.clone(),
                )))
            }
        }
    }
}

fn required<'a>(
    value: &'a Option<String>,
    provider_id: &str,
    field: &str,
) -> Result<&'a str, ProviderError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            ProviderError::Configuration(format!("{} required for provider {}", field, provider_id))
        })
}
