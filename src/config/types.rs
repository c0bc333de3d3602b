//! Console configuration loaded from YAML
//!
//! Every field has a default so a fresh machine can start with no file at all.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::BotConfig;
use crate::error::AppError;

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_log_capacity() -> usize {
    500
}

fn default_trades_limit() -> usize {
    50
}

fn default_sessions_limit() -> usize {
    10
}

fn default_journal_limit() -> usize {
    50
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Root configuration for the operator console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Origin of the bot server; the telemetry channel URL is derived from it
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Fixed delay between telemetry reconnection attempts
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default = "default_trades_limit")]
    pub trades_limit: usize,
    #[serde(default = "default_sessions_limit")]
    pub sessions_limit: usize,
    #[serde(default = "default_journal_limit")]
    pub journal_limit: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Local UI preferences file; platform config dir when unset
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,
    /// Initial values of the start form
    #[serde(default)]
    pub bot: BotConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            log_capacity: default_log_capacity(),
            trades_limit: default_trades_limit(),
            sessions_limit: default_sessions_limit(),
            journal_limit: default_journal_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            preferences_path: None,
            bot: BotConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Validate all configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        let url = reqwest::Url::parse(&self.server_url).map_err(|e| {
            AppError::Config(format!("server_url '{}' is not a URL: {}", self.server_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "server_url must be http or https (got {})",
                url.scheme()
            )));
        }

        if self.refresh_interval_secs == 0 {
            return Err(AppError::Config(
                "refresh_interval_secs must be > 0".to_string(),
            ));
        }
        if self.reconnect_delay_secs == 0 {
            return Err(AppError::Config(
                "reconnect_delay_secs must be > 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.log_capacity == 0 {
            return Err(AppError::Config("log_capacity must be > 0".to_string()));
        }
        if self.trades_limit == 0 || self.sessions_limit == 0 || self.journal_limit == 0 {
            return Err(AppError::Config(format!(
                "list limits must be > 0 (trades={}, sessions={}, journal={})",
                self.trades_limit, self.sessions_limit, self.journal_limit
            )));
        }

        self.bot
            .validate()
            .map_err(|e| AppError::Config(format!("bot defaults: {}", e)))?;

        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Preferences file location, falling back to `<config dir>/bot-console/preferences.json`
    pub fn preferences_file(&self) -> PathBuf {
        if let Some(path) = &self.preferences_path {
            return path.clone();
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bot-console")
            .join("preferences.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConsoleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.log_capacity, 500);
    }

    #[test]
    fn test_rejects_non_http_origin() {
        let config = ConsoleConfig {
            server_url: "ftp://example.com".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("http or https"), "Got: {}", err);
    }

    #[test]
    fn test_rejects_zero_intervals() {
        let config = ConsoleConfig {
            reconnect_delay_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConsoleConfig {
            trades_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_bot_defaults_are_config_errors() {
        let mut config = ConsoleConfig::default();
        config.bot.initial_stake = 0.0;
        match config.validate() {
            Err(AppError::Config(msg)) => assert!(msg.contains("bot defaults"), "Got: {}", msg),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_preferences_path_override() {
        let config = ConsoleConfig {
            preferences_path: Some(PathBuf::from("/tmp/prefs.json")),
            ..Default::default()
        };
        assert_eq!(config.preferences_file(), PathBuf::from("/tmp/prefs.json"));

        let default_path = ConsoleConfig::default().preferences_file();
        assert!(default_path.ends_with("bot-console/preferences.json"));
    }
}
