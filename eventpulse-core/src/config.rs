//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/eventpulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/eventpulse/` (~/.config/eventpulse/)
//! - Data: `$XDG_DATA_HOME/eventpulse/` (~/.local/share/eventpulse/)
//! - State/Logs: `$XDG_STATE_HOME/eventpulse/` (~/.local/state/eventpulse/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analytics and insight thresholds
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analytics and insight configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Minimum attendee count before insight generation fires
    #[serde(default = "default_insight_min_attendees")]
    pub insight_min_attendees: i64,

    /// Maximum number of comment summaries kept per event
    #[serde(default = "default_comment_summary_limit")]
    pub comment_summary_limit: usize,

    /// Comments longer than this are truncated with an ellipsis
    #[serde(default = "default_comment_summary_max_chars")]
    pub comment_summary_max_chars: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            insight_min_attendees: default_insight_min_attendees(),
            comment_summary_limit: default_comment_summary_limit(),
            comment_summary_max_chars: default_comment_summary_max_chars(),
        }
    }
}

fn default_insight_min_attendees() -> i64 {
    5
}

fn default_comment_summary_limit() -> usize {
    10
}

fn default_comment_summary_max_chars() -> usize {
    100
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/eventpulse/config.toml` (~/.config/eventpulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("eventpulse").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite store)
    ///
    /// `$XDG_DATA_HOME/eventpulse/` (~/.local/share/eventpulse/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("eventpulse")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/eventpulse/` (~/.local/state/eventpulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("eventpulse")
    }

    /// Returns the store file path
    ///
    /// `$XDG_DATA_HOME/eventpulse/data.db` (~/.local/share/eventpulse/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/eventpulse/eventpulse.log` (~/.local/state/eventpulse/eventpulse.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("eventpulse.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analytics.insight_min_attendees, 5);
        assert_eq!(config.analytics.comment_summary_limit, 10);
        assert_eq!(config.analytics.comment_summary_max_chars, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[analytics]
insight_min_attendees = 10
comment_summary_limit = 25

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.analytics.insight_min_attendees, 10);
        assert_eq!(config.analytics.comment_summary_limit, 25);
        assert_eq!(config.analytics.comment_summary_max_chars, 100);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_paths() {
        assert!(Config::database_path().ends_with("eventpulse/data.db"));
        assert!(Config::log_path().ends_with("eventpulse/eventpulse.log"));
    }
}
