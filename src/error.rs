//! Application-wide error types using thiserror
//!
//! Every component of the console returns `AppError`. None of these are fatal:
//! callers log them and leave the console in a retriable state.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-level failure talking to the bot server (connect, timeout, decode)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// Non-2xx response; `body` is the server text, verbatim
    #[error("{body}")]
    Server { status: u16, body: String },

    /// Local form fault, raised before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The cooperative UI guard refused the action (control already disabled)
    #[error("{0} is disabled")]
    ControlDisabled(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        AppError::WebSocket(Box::new(err))
    }
}

impl AppError {
    /// True for faults the next refresh or reconnect may clear on its own
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Transport(_) | AppError::WebSocket(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_displays_body_verbatim() {
        let err = AppError::Server {
            status: 400,
            body: "stake too low".into(),
        };
        assert_eq!(err.to_string(), "stake too low");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_serde_error_converts_to_app_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let app_err: AppError = serde_err.into();
        let msg = app_err.to_string();
        assert!(msg.contains("Serialization error"), "Got: {}", msg);
    }

    #[test]
    fn test_io_error_converts_to_app_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let app_err: AppError = io_err.into();
        let msg = app_err.to_string();
        assert!(msg.contains("IO error"), "Got: {}", msg);
        assert!(msg.contains("file missing"), "Got: {}", msg);
    }

    #[test]
    fn test_websocket_error_is_transient() {
        let err: AppError = tokio_tungstenite::tungstenite::Error::ConnectionClosed.into();
        assert!(err.is_transient());
        assert!(err.to_string().starts_with("WebSocket error"));
    }

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("missing server url".into());
        assert_eq!(err.to_string(), "Configuration error: missing server url");
    }

    #[test]
    fn test_control_disabled_display() {
        let err = AppError::ControlDisabled("Start".into());
        assert_eq!(err.to_string(), "Start is disabled");
    }
}
