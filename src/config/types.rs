//! Configuration Types
//!
//! All configuration structures with sensible defaults. The component
//! settings (`RateLimitConfig`, `CacheConfig`, `PromptConfig`, `BatchOptions`,
//! `ProviderConfig`) live next to the code that consumes them and are
//! composed here.

use serde::{Deserialize, Serialize};

use crate::ai::provider::{ProviderConfig, validate_provider_config};
use crate::ai::{CacheConfig, PromptConfig, RateLimitConfig};
use crate::types::{ApiDocError, BatchOptions, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Orchestrator settings
    pub service: AiServiceOptions,

    /// Providers registered at startup, in registration order
    pub providers: Vec<ProviderConfig>,

    /// Default provider name; the first registered provider otherwise
    pub default_provider: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            service: AiServiceOptions::default(),
            providers: Vec::new(),
            default_provider: None,
        }
    }
}

/// Settings read once when an orchestrator is constructed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiServiceOptions {
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub prompt: PromptConfig,
    pub batch: BatchOptions,
}

impl AiServiceOptions {
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.window_secs == 0 {
            return Err(ApiDocError::Config(
                "rate_limit.window_secs must be greater than 0".to_string(),
            ));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ApiDocError::Config(
                "rate_limit.max_requests must be greater than 0".to_string(),
            ));
        }
        if self.cache.max_size == 0 {
            return Err(ApiDocError::Config(
                "cache.max_size must be greater than 0".to_string(),
            ));
        }
        if self.batch.max_concurrency == 0 {
            return Err(ApiDocError::Config(
                "batch.max_concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ApiDocError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        self.service.validate()?;

        for (i, provider) in self.providers.iter().enumerate() {
            validate_provider_config(provider)?;
            if self.providers[..i].iter().any(|p| p.name == provider.name) {
                return Err(ApiDocError::Config(format!(
                    "Provider '{}' is configured more than once",
                    provider.name
                )));
            }
        }

        if let Some(default) = &self.default_provider
            && !self.providers.iter().any(|p| &p.name == default)
        {
            return Err(ApiDocError::Config(format!(
                "default_provider '{}' is not a configured provider",
                default
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::ProviderKind;

    fn mock_provider(name: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            kind: ProviderKind::Mock,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.service.rate_limit.window_secs, 60);
        assert_eq!(config.service.rate_limit.max_requests, 60);
        assert_eq!(config.service.cache.max_size, 1000);
        assert_eq!(config.service.cache.ttl.summarize, 3600);
        assert_eq!(config.service.cache.ttl.enhance, 1800);
        assert_eq!(config.service.cache.ttl.validate, 600);
        assert_eq!(config.service.batch.max_concurrency, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_values() {
        let mut config = Config::default();
        config.service.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.service.batch.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.service.cache.max_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_and_unknown_default() {
        let config = Config {
            providers: vec![mock_provider("a"), mock_provider("a")],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            providers: vec![mock_provider("a")],
            default_provider: Some("b".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [service.rate_limit]
            max_requests = 10

            [[providers]]
            name = "local"
            kind = "ollama"
            model = "llama3:latest"
            "#,
        )
        .unwrap();

        assert_eq!(config.service.rate_limit.max_requests, 10);
        assert_eq!(config.service.rate_limit.window_secs, 60);
        assert_eq!(config.providers[0].kind, ProviderKind::Ollama);
        assert_eq!(config.providers[0].timeout_secs, 30);
        assert_eq!(config.providers[0].retry.max_attempts, 3);
    }
}
