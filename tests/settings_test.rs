use std::fs;

use scribeline::application::services::DispatchMode;
use scribeline::application::services::refinement::LlmPunctuationMode;
use scribeline::presentation::config::{
    Environment, LlmProvider, ProviderKind, Settings, StorageProviderSetting,
};

const TEST_SETTINGS: &str = r#"
[server]
port = 8088

[storage]
provider = "memory"
url_secret = "from-file"

[admission.rate.authenticated]
per_minute = 7
per_day = 70

[admission.quota.free]
daily_requests = 2
monthly_minutes = 10.0
monthly_high_accuracy_minutes = 0.0

[queue.tiers]
free = 1
basic = 1
pro = 2
premium = 3

[[providers]]
id = "primary"
kind = "openai_whisper"
api_key = "sk-test"
model = "whisper-1"

[[providers]]
id = "backup"
kind = "azure_whisper"
enabled = false
base_url = "https://example.openai.azure.com"
api_key = "az-test"
model = "whisper"

[dispatch]
mode = "concurrent"
provider_timeout_secs = 30

[refinement]
llm_punctuation = "per_segment"

[[refinement.corrections]]
pattern = "deep seek"
replacement = "DeepSeek"

[llm]
provider = "openai"
api_key = "llm-test"
chat_model = "gpt-4o-mini"
"#;

#[test]
fn given_environment_file_when_loading_then_sections_are_merged_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("appsettings.test.toml"), TEST_SETTINGS).unwrap();

    let settings = Settings::load(Environment::Test, dir.path()).unwrap();

    assert_eq!(settings.server.port, 8088);
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.storage.provider, StorageProviderSetting::Memory);
    assert_eq!(settings.storage.url_secret, "from-file");
    assert_eq!(settings.admission.rate.authenticated.per_minute, 7);
    assert_eq!(settings.admission.rate.anonymous.per_minute, 10);
    assert_eq!(settings.admission.quota.free.daily_requests, 2);
    assert_eq!(settings.admission.quota.basic.daily_requests, 50);
    assert_eq!(settings.queue.tiers.premium, 3);
    assert_eq!(settings.dispatch.mode, DispatchMode::Concurrent);
    assert_eq!(settings.dispatch.provider_timeout_secs, 30);
    assert_eq!(
        settings.refinement.llm_punctuation,
        LlmPunctuationMode::PerSegment
    );
    assert_eq!(settings.refinement.corrections.len(), 1);
}

#[test]
fn given_provider_list_when_loading_then_order_and_flags_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("appsettings.test.toml"), TEST_SETTINGS).unwrap();

    let settings = Settings::load(Environment::Test, dir.path()).unwrap();

    let ids: Vec<_> = settings.providers.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["primary", "backup"]);
    assert_eq!(settings.providers[0].kind, ProviderKind::OpenAiWhisper);
    assert!(settings.providers[0].enabled);
    assert_eq!(settings.providers[1].kind, ProviderKind::AzureWhisper);
    assert!(!settings.providers[1].enabled);
    assert_eq!(settings.providers[1].api_version, "2024-06-01");

    let llm = settings.llm.unwrap();
    assert_eq!(llm.provider, LlmProvider::OpenAi);
    assert_eq!(llm.max_tokens, 2048);
}

#[test]
fn given_no_settings_file_when_loading_then_defaults_apply() {
    let dir = tempfile::tempdir().unwrap();

    let settings = Settings::load(Environment::Local, dir.path()).unwrap();

    assert_eq!(settings.server.port, 3000);
    assert!(settings.database.url.is_none());
    assert!(settings.providers.is_empty());
    assert!(settings.llm.is_none());
    assert_eq!(settings.maintenance.prune_interval_secs, 300);
}

#[test]
fn given_app_prefixed_variable_when_loading_then_it_overrides_the_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("appsettings.test.toml"), TEST_SETTINGS).unwrap();
    // SAFETY: no other test reads or writes this variable.
    unsafe {
        std::env::set_var("APP__SERVER__ADMIN_TOKEN", "env-token");
    }

    let settings = Settings::load(Environment::Test, dir.path()).unwrap();

    unsafe {
        std::env::remove_var("APP__SERVER__ADMIN_TOKEN");
    }
    assert_eq!(settings.server.admin_token.as_deref(), Some("env-token"));
    assert_eq!(settings.server.port, 8088);
}

#[test]
fn given_environment_names_when_parsed_then_aliases_are_accepted() {
    assert_eq!(
        Environment::try_from("production".to_string()),
        Ok(Environment::Prod)
    );
    assert_eq!(Environment::try_from("TEST".to_string()), Ok(Environment::Test));
    assert!(Environment::try_from("staging".to_string()).is_err());
    assert_eq!(" Dev ".parse::<Environment>(), Ok(Environment::Local));
}

#[test]
fn given_environment_when_naming_settings_file_then_lowercase_stem_is_used() {
    assert_eq!(Environment::Prod.settings_file_stem(), "appsettings.prod");
    assert_eq!(Environment::default(), Environment::Local);
    assert!(Environment::Prod.prefers_json_logs());
    assert!(!Environment::Test.prefers_json_logs());
}
