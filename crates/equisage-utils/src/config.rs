//! Application-level configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable selecting the log output format
pub const ENV_LOG_FORMAT: &str = "EQUISAGE_LOG_FORMAT";
/// Environment variable selecting the data directory
pub const ENV_DATA_DIR: &str = "EQUISAGE_DATA_DIR";

/// Errors raised while reading application configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Unknown log format name
    #[error("Unknown log format '{0}', expected 'pretty' or 'json'")]
    UnknownLogFormat(String),
}

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, coloured when attached to a terminal
    #[default]
    Pretty,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name, used in log lines and the CLI banner
    pub app_name: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Directory for generated files (charts, report documents)
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "equisage".to_string(),
            log_format: LogFormat::Pretty,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let log_format = match std::env::var(ENV_LOG_FORMAT) {
            Ok(value) => value.parse()?,
            Err(_) => defaults.log_format,
        };
        let data_dir = std::env::var(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        Ok(Self {
            app_name: defaults.app_name,
            log_format,
            data_dir,
        })
    }

    /// Directory where chart images are written
    pub fn charts_dir(&self) -> PathBuf {
        self.data_dir.join("charts")
    }

    /// Directory where report documents are written
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}
