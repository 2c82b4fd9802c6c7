mod async_job_provider;
mod azure_whisper_provider;
mod openai_whisper_provider;
mod provider_factory;
mod whisper_response;

pub use async_job_provider::AsyncJobProvider;
pub use azure_whisper_provider::AzureWhisperProvider;
pub use openai_whisper_provider::OpenAiWhisperProvider;
pub use provider_factory::ProviderFactory;
pub use whisper_response::{VerboseTranscription, language_code};
