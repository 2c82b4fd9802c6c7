use std::path::Path;

use config::{Config, ConfigError, Environment as EnvironmentSource, File};
use serde::Deserialize;

use crate::application::services::admission::{AbusePolicy, QuotaPolicy, RateLimitPolicy};
use crate::application::services::refinement::RefinementConfig;
use crate::application::services::{
    AudioPipelineConfig, DispatchConfig, JobServiceConfig, PriorityPolicy, TierConcurrency,
    WorkerConfig,
};

use super::Environment;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub admission: AdmissionSettings,
    pub queue: QueueSettings,
    pub audio: AudioSettings,
    pub providers: Vec<ProviderSettings>,
    pub dispatch: DispatchConfig,
    pub refinement: RefinementConfig,
    pub llm: Option<LlmSettings>,
    pub jobs: JobServiceConfig,
    pub maintenance: MaintenanceSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Layers `appsettings.{env}.toml` from `dir` under `APP__SECTION__KEY`
    /// environment overrides.
    pub fn load(environment: Environment, dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = dir.as_ref().join(environment.settings_file_stem());
        Config::builder()
            .add_source(File::from(file).required(false))
            .add_source(
                EnvironmentSource::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Required on admin routes when set.
    pub admin_token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            admin_token: None,
        }
    }
}

/// Without a `url` the service runs on in-memory repositories.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// In-memory stores are used when unset.
    pub url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
    pub connect_retries: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            run_migrations: true,
            connect_retries: 5,
            acquire_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProviderSetting {
    Local,
    Memory,
    Azure,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub provider: StorageProviderSetting,
    pub local_path: String,
    pub azure_account: Option<String>,
    pub azure_access_key: Option<String>,
    pub azure_container: Option<String>,
    /// Prefix of signed blob URLs, normally this service's `/blobs` route.
    pub public_base_url: String,
    pub url_secret: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProviderSetting::Local,
            local_path: "./data/blobs".to_string(),
            azure_account: None,
            azure_access_key: None,
            azure_container: None,
            public_base_url: "http://localhost:3000/blobs".to_string(),
            url_secret: "change-me".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdmissionSettings {
    pub rate: RateLimitPolicy,
    pub quota: QuotaPolicy,
    pub abuse: AbusePolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub priority: PriorityPolicy,
    pub tiers: TierConcurrency,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub pipeline: AudioPipelineConfig,
    pub fetch_timeout_secs: Option<u64>,
    pub ffmpeg: FfmpegSettings,
    pub clip_worker: Option<ClipWorkerSettings>,
    pub resolvers: Vec<ResolverSettings>,
}

impl AudioSettings {
    pub fn fetch_timeout(&self) -> u64 {
        self.fetch_timeout_secs.unwrap_or(120)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FfmpegSettings {
    pub binary: String,
    pub timeout_secs: u64,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClipWorkerSettings {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_clip_worker_timeout")]
    pub timeout_secs: u64,
}

fn default_clip_worker_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverSettings {
    pub name: String,
    pub endpoint: String,
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(rename = "openai_whisper")]
    OpenAiWhisper,
    AzureWhisper,
    AsyncJob,
}

/// One transcription provider. For Azure, `model` names the deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub id: String,
    pub kind: ProviderKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub high_accuracy_model: Option<String>,
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,
}

fn default_enabled() -> bool {
    true
}

fn default_azure_api_version() -> String {
    "2024-06-01".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Azure,
    Compatible,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: String,
    pub chat_model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub azure_endpoint: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> usize {
    2048
}

fn default_llm_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaintenanceSettings {
    pub prune_interval_secs: u64,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            prune_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive; `RUST_LOG` overrides it.
    pub filter: Option<String>,
    pub enable_json: bool,
}
