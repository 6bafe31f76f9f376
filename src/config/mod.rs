//! Configuration for lightbox.
//!
//! Read from `~/.config/lightbox/config.toml` at startup. If the file
//! doesn't exist, a commented default is written in its place. Missing
//! fields fall back to defaults.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the catalog API.
    pub base_url: String,
    /// Sent as the `Authorization` header on every request.
    pub api_key: Option<String>,
    /// Upper bound on any single remote call.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example.com/".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Daemon update interval, e.g. "1h", "30m", "90s".
    pub interval: String,
    /// Run a sync immediately when the daemon starts.
    pub update_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: "1h".to_string(),
            update_on_start: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Config {
    /// Load configuration from the default path, creating a commented
    /// default file when none exists.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// `~/.config/lightbox/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("lightbox").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# Lightbox configuration

[api]
# Base URL of the catalog API.
base_url = "https://api.example.com/"

# Optional API key, sent as the Authorization header on every request.
# api_key = "Bearer ..."

# Upper bound (seconds) on any single remote call.
timeout_secs = 10

[sync]
# Daemon update interval: "1h", "30m", "90s", "1d", or raw seconds.
interval = "1h"

# Run a sync immediately when the daemon starts.
update_on_start = true
"##
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_content_parses_back_to_defaults() {
        let parsed: Config = toml::from_str(Config::default_config_content()).unwrap();
        assert_eq!(parsed.api.base_url, ApiConfig::default().base_url);
        assert_eq!(parsed.api.timeout_secs, 10);
        assert_eq!(parsed.api.api_key, None);
        assert_eq!(parsed.sync.interval, "1h");
        assert!(parsed.sync.update_on_start);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[api]\nbase_url = \"https://x.test/\"\n").unwrap();
        assert_eq!(parsed.api.base_url, "https://x.test/");
        assert_eq!(parsed.api.timeout_secs, 10);
        assert_eq!(parsed.sync.interval, "1h");
    }
}
