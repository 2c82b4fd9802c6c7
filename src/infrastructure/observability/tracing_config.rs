use crate::presentation::config::{Environment, LoggingSettings};

pub const DEFAULT_FILTER: &str = "info,scribeline=debug,tower_http=debug";

pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
    pub filter: String,
}

impl TracingConfig {
    /// JSON output is chosen by settings, by the environment, or forced with
    /// `LOG_FORMAT=json`.
    pub fn from_settings(environment: Environment, logging: &LoggingSettings) -> Self {
        let forced_json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        Self {
            environment: environment.as_str().to_string(),
            json_format: forced_json || logging.enable_json || environment.prefers_json_logs(),
            filter: logging
                .filter
                .clone()
                .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
        }
    }
}
