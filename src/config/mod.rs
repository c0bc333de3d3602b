//! Configuration module
//!
//! This module provides:
//! - `ConsoleConfig` and YAML loading (`load_config`)
//! - Developer logging setup and secret redaction
//! - Constants with environment variable overrides

pub mod constants;
pub mod logging;
mod loader;
mod types;

pub use types::ConsoleConfig;

pub use loader::{load_config, load_config_from_str};

pub use logging::{init_logging, is_tui_mode, LogFormat, LoggingConfig, SanitizedValue};
