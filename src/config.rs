//! Configuration loader and validator for the beer catalog service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub database: Database,
    pub anthropic: Anthropic,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub bind_addr: String,
}

/// Catalog database settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub url: String,
}

/// Model provider settings for name extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Anthropic {
    pub api_key: String,
    pub model: String,
    pub version: String,
    pub max_tokens: u32,
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - `ANTHROPIC_API_KEY`, when set and non-empty, overrides the file value.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    apply_api_key_override(&mut cfg, std::env::var("ANTHROPIC_API_KEY").ok());
    validate(&cfg)?;
    Ok(cfg)
}

/// Replace the configured API key when one is supplied and non-empty.
fn apply_api_key_override(cfg: &mut Config, key: Option<String>) {
    if let Some(key) = key {
        if !key.trim().is_empty() {
            cfg.anthropic.api_key = key;
        }
    }
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("app.bind_addr must be non-empty"));
    }

    if cfg.database.url.trim().is_empty() {
        return Err(ConfigError::Invalid("database.url must be non-empty"));
    }

    if cfg.anthropic.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("anthropic.api_key must be non-empty"));
    }
    if cfg.anthropic.model.trim().is_empty() {
        return Err(ConfigError::Invalid("anthropic.model must be non-empty"));
    }
    if cfg.anthropic.version.trim().is_empty() {
        return Err(ConfigError::Invalid("anthropic.version must be non-empty"));
    }
    if cfg.anthropic.max_tokens == 0 {
        return Err(ConfigError::Invalid("anthropic.max_tokens must be > 0"));
    }

    Ok(())
}

/// Example configuration with the service defaults filled in.
pub fn example() -> &'static str {
    r#"app:
  bind_addr: "0.0.0.0:8080"

database:
  url: "sqlite://./data/brewpair.db"

anthropic:
  api_key: "YOUR_ANTHROPIC_API_KEY"
  model: "claude-3-opus-20240229"
  version: "2023-06-01"
  max_tokens: 1000
"#
}
