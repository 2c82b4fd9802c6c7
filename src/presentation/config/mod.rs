mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    AdmissionSettings, AudioSettings, ClipWorkerSettings, DatabaseSettings, FfmpegSettings,
    LlmProvider, LlmSettings, LoggingSettings, MaintenanceSettings, ProviderKind,
    ProviderSettings, QueueSettings, ResolverSettings, ServerSettings, Settings,
    StorageProviderSetting, StorageSettings,
};
