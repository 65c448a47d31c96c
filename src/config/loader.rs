//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/apidoc-ai/config.toml)
//! 3. Project config (.apidoc-ai/config.toml)
//! 4. Environment variables (APIDOC_* prefix, `__` between keys)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{ApiDocError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        Self::finish(figment.merge(Self::env()))
    }

    /// Load defaults, then `path`, then environment overrides
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(ApiDocError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        debug!("Loading config from: {}", path.display());

        Self::finish(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::file(path))
                .merge(Self::env()),
        )
    }

    /// Environment overrides, e.g. `APIDOC_SERVICE__RATE_LIMIT__MAX_REQUESTS=10`
    fn env() -> Env {
        Env::prefixed("APIDOC_").split("__").lowercase(true)
    }

    fn finish(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| ApiDocError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/apidoc-ai/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("apidoc-ai"))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".apidoc-ai/config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show an effective configuration (API keys are never serialized)
    pub fn show_config(config: &Config, as_json: bool) -> Result<()> {
        if as_json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(config).map_err(|e| ApiDocError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    /// Write a starter project config; existing files are kept unless `force`
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let path = Self::project_config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        if !path.exists() || force {
            fs::write(&path, Self::default_project_config())?;
            info!("Created project config: {}", path.display());
        } else {
            info!("Project config exists: {}", path.display());
        }
        Ok(path)
    }

    fn default_project_config() -> &'static str {
        r#"# apidoc-ai configuration
version = "1.0"
default_provider = "openai"

[service.rate_limit]
window_secs = 60
max_requests = 60

[service.cache]
enabled = true
max_size = 1000

[service.cache.ttl]
summarize = 3600
enhance = 1800
validate = 600

[service.batch]
maxConcurrency = 3
failureStrategy = "continue"

# API key is read from OPENAI_API_KEY when not set here
[[providers]]
name = "openai"
kind = "openai"
model = "gpt-4o-mini"
timeout_secs = 30

[providers.retry]
max_attempts = 3
base_delay_ms = 1000
max_delay_ms = 10000
jitter = 0.25
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::ProviderKind;
    use crate::types::FailureStrategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            default_provider = "local"

            [service.cache]
            max_size = 50

            [service.batch]
            maxConcurrency = 5
            failureStrategy = "stop-on-error"

            [[providers]]
            name = "local"
            kind = "mock"
            "#
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.service.cache.max_size, 50);
        assert!(config.service.cache.enabled);
        assert_eq!(config.service.batch.max_concurrency, 5);
        assert_eq!(
            config.service.batch.failure_strategy,
            FailureStrategy::StopOnError
        );
        assert_eq!(config.providers[0].kind, ProviderKind::Mock);
        assert_eq!(config.default_provider.as_deref(), Some("local"));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[service.rate_limit]\nmax_requests = 0").unwrap();
        assert!(matches!(
            ConfigLoader::load_from_file(file.path()),
            Err(ApiDocError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::load_from_file(Path::new("/nonexistent/apidoc.toml"));
        assert!(matches!(result, Err(ApiDocError::Config(_))));
    }

    #[test]
    fn test_starter_config_parses() {
        let config: Config = toml::from_str(ConfigLoader::default_project_config()).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].retry.jitter, 0.25);
        assert!(config.validate().is_ok());
    }
}
