use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::providers::Source;

/// Lower bound for the poll interval; anything faster hammers the usage APIs.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_true")]
    pub notifications: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_poll_interval() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            notifications: true,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub session_key: String,
    #[serde(default)]
    pub organization_id: String,
    /// Override for the claude.ai API base (must be HTTPS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_key: String::new(),
            organization_id: String::new(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Path to the Gemini CLI OAuth credentials (defaults to ~/.gemini/oauth_creds.json)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<String>,
    /// Override for the quota endpoint (must be HTTPS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            credentials_path: None,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub claude: ClaudeConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("burnout").join("config.toml")
    }

    /// Load config from the default path, falling back to defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Serialize and write this config to the config file path.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.settings.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }

    pub fn is_enabled(&self, source: Source) -> bool {
        match source {
            Source::Claude => self.claude.enabled,
            Source::Gemini => self.gemini.enabled,
        }
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.settings.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            issues.push(format!(
                "poll_interval_secs is {} (must be at least {})",
                self.settings.poll_interval_secs, MIN_POLL_INTERVAL_SECS
            ));
        }
        if !LOG_LEVELS.contains(&self.settings.log_level.as_str()) {
            issues.push(format!(
                "Invalid log_level: '{}' (must be one of {})",
                self.settings.log_level,
                LOG_LEVELS.join("|")
            ));
        }
        for (source, endpoint) in [
            (Source::Claude, &self.claude.endpoint),
            (Source::Gemini, &self.gemini.endpoint),
        ] {
            if let Some(url) = endpoint {
                if let Err(e) = crate::core::providers::fetch::validate_endpoint(url, source) {
                    issues.push(e.to_string());
                }
            }
        }
        issues
    }
}
