//! Render port: every UI effect the components produce
//!
//! Components never touch the terminal directly. They push state through this
//! trait; the TUI implements it, tests record it. Every method has a no-op
//! default so a port only overrides what it displays.

use tracing::{info, warn};

use crate::api::{CashFlowPoint, JournalEntry, Settings, Strategy, Trade, TradeReport};

use super::analytics::ChatTurn;
use super::bot_controller::BotView;
use super::connection::ConnectionState;
use super::controls::Control;
use super::log_console::{LogEntry, LogKind};
use super::settings::Theme;
use super::strategy_store::EditorView;
use super::telemetry::{ChartSeries, SessionRow, StatsView};

/// Per-panel load state; a failed pull only affects its own panel
#[derive(Debug, Clone, PartialEq)]
pub enum PanelState<T> {
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> PanelState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            PanelState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PanelState::Failed(_))
    }
}

impl<T> Default for PanelState<T> {
    fn default() -> Self {
        PanelState::Loading
    }
}

pub trait RenderPort: Send + Sync {
    // Connection & bot
    fn connection_changed(&self, _state: ConnectionState) {}
    fn bot_changed(&self, _view: &BotView) {}
    /// Runtime clock text, `-` when blank
    fn runtime_tick(&self, _runtime: &str) {}
    fn control_changed(&self, _control: Control, _enabled: bool) {}

    // Operator log
    /// `evicted` oldest entries were dropped to make room
    fn log_appended(&self, _entry: &LogEntry, _evicted: usize) {}
    fn log_cleared(&self) {}

    // Telemetry
    fn stats_changed(&self, _stats: &PanelState<StatsView>) {}
    fn trades_changed(&self, _trades: &PanelState<Vec<Trade>>) {}
    fn sessions_changed(&self, _sessions: &PanelState<Vec<SessionRow>>) {}
    fn charts_changed(&self, _charts: &PanelState<ChartSeries>) {}
    fn filter_changed(&self, _filter: Option<&str>) {}

    // Strategies & journal
    fn strategies_changed(&self, _strategies: &PanelState<Vec<Strategy>>) {}
    fn editor_changed(&self, _editor: &EditorView) {}
    fn journal_changed(&self, _entries: &PanelState<Vec<JournalEntry>>) {}

    // Analytics
    fn cash_flow_changed(&self, _points: &PanelState<Vec<CashFlowPoint>>) {}
    fn report_changed(&self, _report: &PanelState<TradeReport>) {}
    fn transcript_changed(&self, _turns: &[ChatTurn]) {}

    // Settings
    fn settings_changed(&self, _settings: &Settings) {}
    fn setup_changed(&self, _required: bool) {}
    fn guide_changed(&self, _visible: bool) {}
    fn theme_changed(&self, _theme: Theme) {}
    /// Settings changed; the whole console must be rebuilt
    fn reload_requested(&self) {}
}

/// Port that renders nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPort;

impl RenderPort for NullPort {}

/// Target of headless operator events; inside the crate so the default filter keeps them
pub const OPERATOR_TARGET: &str = "bot_console::operator";

/// Headless port: the operator log and state changes become `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPort;

impl RenderPort for TracingPort {
    fn connection_changed(&self, state: ConnectionState) {
        info!(target: OPERATOR_TARGET, connection = state.label(), "Connection state changed");
    }

    fn bot_changed(&self, view: &BotView) {
        info!(target: OPERATOR_TARGET, state = ?view.state, controls_locked = !view.start_enabled && !view.stop_enabled, "Bot state changed");
    }

    fn log_appended(&self, entry: &LogEntry, _evicted: usize) {
        match entry.kind {
            LogKind::Error => warn!(target: OPERATOR_TARGET, kind = %entry.kind, "{}", entry.message),
            _ => info!(target: OPERATOR_TARGET, kind = %entry.kind, "{}", entry.message),
        }
    }

    fn setup_changed(&self, required: bool) {
        if required {
            warn!(target: OPERATOR_TARGET, "API token missing; run the console with LOG_FORMAT=tui to complete setup");
        }
    }
}
