//! Configuration loader for YAML files
//!
//! A missing file is not an error: the console falls back to defaults so it can
//! start on a fresh machine. Environment overrides are applied last.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::info;

use crate::error::AppError;

use super::constants::SERVER_URL_ENV;
use super::types::ConsoleConfig;

/// Load configuration from a YAML file
///
/// # Returns
/// * `Ok(ConsoleConfig)` - Parsed (or default) configuration with env overrides, validated
/// * `Err(AppError)` - Parse error or validation failure
pub fn load_config(path: &Path) -> Result<ConsoleConfig, AppError> {
    let mut config = if path.exists() {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).map_err(|e| {
            AppError::Config(format!("YAML parse error in '{}': {}", path.display(), e))
        })?
    } else {
        info!(path = %path.display(), "No configuration file, using defaults");
        ConsoleConfig::default()
    };

    apply_env_overrides(&mut config);
    config.validate()?;

    Ok(config)
}

/// Load configuration from a YAML string (useful for testing)
pub fn load_config_from_str(yaml_content: &str) -> Result<ConsoleConfig, AppError> {
    let config: ConsoleConfig = serde_yaml::from_str(yaml_content)
        .map_err(|e| AppError::Config(format!("YAML parse error: {}", e)))?;

    config.validate()?;

    Ok(config)
}

fn apply_env_overrides(config: &mut ConsoleConfig) {
    if let Ok(url) = std::env::var(SERVER_URL_ENV) {
        if !url.trim().is_empty() {
            info!(server_url = %url, "Server URL overridden from environment");
            config.server_url = url.trim().to_string();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
