//! Bot Console
//!
//! Terminal operator console for a remotely hosted trading bot:
//! - Telemetry channel with fixed-delay reconnection
//! - Bot start/stop state machine with status reconciliation
//! - Stats, trades and sessions panels with chart series
//! - Bounded operator log, strategy scripts, journal and analytics

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod tui;

pub use error::AppError;
