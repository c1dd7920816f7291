//! Configuration types for Stepwise.
//!
//! `StepwiseConfig` represents the `config.toml` that controls the model
//! gateway connection, pricing overrides and event delivery. Every field has
//! a default so an empty file is valid.

use serde::{Deserialize, Serialize};

/// Default chat-completions endpoint of the Unbound gateway.
pub const DEFAULT_BASE_URL: &str = "https://api.getunbound.ai/v1/chat/completions";

/// Environment variable holding the gateway API key.
pub const DEFAULT_API_KEY_ENV: &str = "UNBOUND_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepwiseConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Per-model rate overrides, checked before the built-in table.
    #[serde(default)]
    pub pricing: Vec<ModelPricing>,

    #[serde(default)]
    pub events: EventSettings,
}

/// Connection settings for the model gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable the API key is read from.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f64 {
    crate::llm::DEFAULT_TEMPERATURE
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// Rates for models whose identifier starts with `model_pattern`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    pub model_pattern: String,
    /// USD per 1000 prompt tokens.
    pub prompt_rate_per_1k: f64,
    /// USD per 1000 completion tokens.
    pub completion_rate_per_1k: f64,
}

/// Event delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    /// Capacity of the buffered channel between the engine and observers.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: StepwiseConfig = toml::from_str("").unwrap();
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.provider.api_key_env, "UNBOUND_API_KEY");
        assert_eq!(config.provider.timeout_secs, 60);
        assert!((config.provider.temperature - 0.2).abs() < f64::EPSILON);
        assert!(config.provider.max_tokens.is_none());
        assert!(config.pricing.is_empty());
        assert_eq!(config.events.channel_capacity, 256);
    }

    #[test]
    fn toml_with_values_parses() {
        let toml_str = r#"
[provider]
timeout_secs = 15
max_tokens = 2048

[[pricing]]
model_pattern = "kimi-k2p5"
prompt_rate_per_1k = 0.01
completion_rate_per_1k = 0.03

[events]
channel_capacity = 8
"#;
        let config: StepwiseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.timeout_secs, 15);
        assert_eq!(config.provider.max_tokens, Some(2048));
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.pricing.len(), 1);
        assert_eq!(config.pricing[0].model_pattern, "kimi-k2p5");
        assert_eq!(config.events.channel_capacity, 8);
    }
}
