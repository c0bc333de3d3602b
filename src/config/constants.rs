//! Application-wide constants and defaults
//!
//! Values that are not part of `console.yaml` but may still be tuned through
//! environment variables.

use std::path::PathBuf;

// =============================================================================
// Environment variable names
// =============================================================================

/// Path of the YAML configuration file
pub const CONFIG_PATH_ENV: &str = "CONSOLE_CONFIG";

/// Overrides `server_url` from the configuration file
pub const SERVER_URL_ENV: &str = "CONSOLE_SERVER_URL";

/// Configuration file used when `CONSOLE_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "console.yaml";

/// Resolve the configuration file path from `CONSOLE_CONFIG`
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

// =============================================================================
// Telemetry channel
// =============================================================================

/// Path of the telemetry channel on the server origin
pub const CHANNEL_PATH: &str = "/ws";

// =============================================================================
// Terminal UI
// =============================================================================

/// Developer trace pane capacity (default: 200 lines)
///
/// Environment variable: `DEV_PANE_CAPACITY`
pub fn dev_pane_capacity() -> usize {
    std::env::var("DEV_PANE_CAPACITY")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or(200)
}

/// Action queue capacity between the key handler and the dispatcher (default: 64)
///
/// Environment variable: `ACTION_QUEUE_CAPACITY`
pub fn action_queue_capacity() -> usize {
    std::env::var("ACTION_QUEUE_CAPACITY")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or(64)
}

/// Number of trades shown in the profit distribution chart
pub const PROFIT_WINDOW: usize = 20;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_path_default_and_override() {
        std::env::remove_var(CONFIG_PATH_ENV);
        assert_eq!(config_path(), PathBuf::from("console.yaml"));

        std::env::set_var(CONFIG_PATH_ENV, "/etc/bot-console.yaml");
        assert_eq!(config_path(), PathBuf::from("/etc/bot-console.yaml"));
        std::env::remove_var(CONFIG_PATH_ENV);
    }

    #[test]
    #[serial]
    fn test_dev_pane_capacity_ignores_garbage() {
        std::env::set_var("DEV_PANE_CAPACITY", "abc");
        assert_eq!(dev_pane_capacity(), 200);
        std::env::set_var("DEV_PANE_CAPACITY", "0");
        assert_eq!(dev_pane_capacity(), 200);
        std::env::set_var("DEV_PANE_CAPACITY", "50");
        assert_eq!(dev_pane_capacity(), 50);
        std::env::remove_var("DEV_PANE_CAPACITY");
    }
}
