//! Configuration loading, validation, and management for mindloop.
//!
//! Loads configuration from a TOML file with environment variable
//! overrides (`MINDLOOP_*`). Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider endpoint base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Per-run loop limits
    #[serde(default)]
    pub run: RunConfig,

    /// Optional tool backends
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_base_url() -> String {
    "https://api.deepseek.com/v1".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("run", &self.run)
            .field("tools", &self.tools)
            .finish()
    }
}

/// Limits applied to every agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum think/execute rounds before forced termination
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Maximum messages held in a session's memory window
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

fn default_max_steps() -> u32 {
    20
}
fn default_max_messages() -> usize {
    20
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_messages: default_max_messages(),
        }
    }
}

/// Backends for the optional tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Postgres URL for the database query tool; the tool is only
    /// registered when this is set and the agent profile names it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Root directory the filesystem tools are confined to.
    /// Defaults to the process working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            run: RunConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config: AppConfig = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `MINDLOOP_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("MINDLOOP_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("MINDLOOP_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(model) = std::env::var("MINDLOOP_MODEL") {
            self.default_model = model;
        }
        if let Ok(url) = std::env::var("MINDLOOP_DATABASE_URL") {
            self.tools.database_url = Some(url);
        }
    }

    /// Validate settings that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_model.is_empty() {
            return Err(ConfigError::Invalid("default_model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::Invalid(format!(
                "default_temperature must be within [0.0, 2.0], got {}",
                self.default_temperature
            )));
        }
        if self.run.max_steps == 0 {
            return Err(ConfigError::Invalid("run.max_steps must be at least 1".into()));
        }
        if self.run.max_messages < 2 {
            return Err(ConfigError::Invalid(
                "run.max_messages must be at least 2 (system prompt + one message)".into(),
            ));
        }
        Ok(())
    }
}
