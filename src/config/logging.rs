//! Developer logging setup
//!
//! Developer diagnostics go through `tracing`; they never reach the operator
//! log pane.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | `bot_console=info` | Log level filter |
//! | `LOG_FORMAT` | `json` | `json`, `pretty`, or `tui` |
//!
//! In `tui` mode stdout belongs to the terminal UI, so the caller installs the
//! subscriber itself with `tui::TuiLayer` instead of calling [`init_logging`].

use std::env;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Default filter when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "bot_console=info";

/// Output format for developer logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Tui,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "tui" => LogFormat::Tui,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level_filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level_filter: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let level_filter =
            env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
        let format = env::var("LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or(LogFormat::Json);
        Self {
            level_filter,
            format,
        }
    }

    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
    }
}

/// True when `LOG_FORMAT=tui`
pub fn is_tui_mode() -> bool {
    LoggingConfig::from_env().format == LogFormat::Tui
}

/// Install a json or pretty subscriber on stderr
///
/// Subsequent calls are no-ops. Returns false in `tui` mode, where the caller
/// owns subscriber setup.
pub fn init_logging(config: &LoggingConfig) -> bool {
    if config.format == LogFormat::Tui {
        return false;
    }
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return true;
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        _ => builder.json().try_init(),
    };
    if result.is_err() {
        // Another subscriber was installed first (tests)
        LOGGING_INITIALIZED.store(true, Ordering::SeqCst);
    }
    true
}

/// Wrapper for secrets that should never appear in full in logs
///
/// Values longer than 8 characters keep their first 4; shorter ones are fully redacted.
#[derive(Clone)]
pub struct SanitizedValue<'a>(&'a str);

impl<'a> SanitizedValue<'a> {
    pub fn new(value: &'a str) -> Self {
        Self(value)
    }
}

impl fmt::Display for SanitizedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.char_indices().nth(4) {
            Some((cut, _)) if self.0.chars().count() > 8 => {
                write!(f, "{}...REDACTED", &self.0[..cut])
            }
            _ => write!(f, "REDACTED"),
        }
    }
}

impl fmt::Debug for SanitizedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SanitizedValue(***)")
    }
}
