//! Runtime configuration, loaded from YAML.
//!
//! ```yaml
//! provider: openai
//! provider_config:
//!   base_url: https://api.openai.com/v1   # api_key falls back to OPENAI_API_KEY
//! model: gpt-4o-mini
//! max_tokens: 800
//! temperature: 0.3
//! timeout: 30s
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::providers::{CompletionConfig, LlmProvider, ProviderError, ProviderRegistry};

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Provider and completion settings for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Provider type, resolved through the [`ProviderRegistry`]
    pub provider: String,

    /// Opaque provider settings handed to the factory
    #[serde(default = "empty_object")]
    pub provider_config: JsonValue,

    /// Model; defaults to the provider's default
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Provider request timeout, e.g. "30s"
    #[serde(default = "default_timeout", with = "humantime_duration")]
    pub timeout: Duration,
}

fn empty_object() -> JsonValue {
    JsonValue::Object(Default::default())
}

fn default_max_tokens() -> u32 {
    800
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

impl RuntimeConfig {
    /// Config for a provider type with every other setting defaulted.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            provider_config: empty_object(),
            model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout: default_timeout(),
        }
    }

    pub fn with_provider_config(mut self, config: JsonValue) -> Self {
        self.provider_config = config;
        self
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::ValidationError("provider is empty".to_string()));
        }
        if !self.provider_config.is_object() {
            return Err(ConfigError::ValidationError(
                "provider_config must be a mapping".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens must be positive".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "temperature {} outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ValidationError("timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// Create the configured provider.
    pub fn create_provider(
        &self,
        registry: &ProviderRegistry,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        registry.validate(&self.provider, &self.provider_config)?;
        registry.create(&self.provider, &self.provider_config)
    }

    /// Completion settings, falling back to the provider's default model.
    pub fn completion_config(&self, registry: &ProviderRegistry) -> CompletionConfig {
        let model = self
            .model
            .clone()
            .or_else(|| {
                registry
                    .default_config(&self.provider)
                    .and_then(|c| c["model"].as_str().map(str::to_string))
            })
            .unwrap_or_else(|| CompletionConfig::default().model);

        CompletionConfig {
            model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            ..CompletionConfig::default()
        }
    }
}
