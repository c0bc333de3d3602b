//! Core module - connection, bot lifecycle, telemetry, log console, stores, runtime
//!
//! # Module Architecture
//!
//! This module uses **explicit re-exports** instead of glob exports (`pub use module::*`)
//! to keep the public API visible in one place.
//!
//! ## Usage
//! Prefer importing from `crate::core`:
//! ```ignore
//! use bot_console::core::{Console, LogConsole, TelemetryAggregator};
//! ```
//!
//! ## Adding New Public Types
//! When adding new public types to submodules, explicitly add them to the
//! re-exports below to make them part of the public API.

pub mod analytics;
pub mod bot_controller;
pub mod bot_form;
pub mod channels;
pub mod connection;
pub mod controls;
pub mod journal;
pub mod log_console;
pub mod render;
pub mod runtime;
pub mod settings;
pub mod strategy_store;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

// Explicit re-exports for the render port
pub use render::{NullPort, PanelState, RenderPort, TracingPort, OPERATOR_TARGET};

// Explicit re-exports for controls
pub use controls::{Control, ControlGuard, ControlSet};

// Explicit re-exports for the log console
pub use log_console::{forwardable, LogBuffer, LogConsole, LogEntry, LogKind, DEFAULT_LOG_CAPACITY};

// Explicit re-exports for the telemetry channel
pub use connection::{
    channel_url, parse_frame, ConnectionManager, ConnectionState, FrameStream, TelemetryTransport,
    WsTransport,
};

// Explicit re-exports for the bot lifecycle
pub use bot_controller::{format_runtime, BotController, BotState, BotView, BLANK_RUNTIME};
pub use bot_form::{BotForm, FORM_FIELDS};

// Explicit re-exports for telemetry
pub use telemetry::{
    is_win, sort_trades, win_rate, ChartSeries, PnlPoint, ProfitBar, SessionRow, StatsView,
    TelemetryAggregator, TelemetrySnapshot,
};

// Explicit re-exports for strategies, settings, journal, analytics
pub use analytics::{AnalyticsPanel, ChatTurn, Speaker, DBOT_MODE};
pub use journal::JournalManager;
pub use settings::{PreferenceStore, Preferences, SettingsManager, SetupState, Theme};
pub use strategy_store::{normalize_name, parse_tags, EditorView, StrategyStore, DEFAULT_TEMPLATE, UNTITLED};

// Explicit re-exports for the runtime
pub use channels::{Action, ChannelBundle, DEFAULT_CHANNEL_CAPACITY};
pub use runtime::Console;
