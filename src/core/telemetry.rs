//! Telemetry aggregation and chart series derivation
//!
//! `refresh_all` runs the stats, trades and sessions pulls concurrently. Each
//! pull applies its own result as soon as it lands, so one failure never
//! blocks or rolls back the others. Every refresh takes a new generation;
//! results from an older one are dropped, so a slow pull for a previous
//! filter never overwrites a newer view. Chart series are a pure function of
//! the latest trade list.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::controls::{Control, ControlSet};
use super::log_console::LogConsole;
use super::render::{PanelState, RenderPort};
use crate::api::{ConsoleApi, Session, Trade, TradeStats, BUILTIN_STRATEGIES};
use crate::config::constants::PROFIT_WINDOW;
use crate::error::Result;

// ============================================================================
// Derived values
// ============================================================================

/// Percentage of winning trades; 0 when there are none
pub fn win_rate(winning: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        winning as f64 / total as f64 * 100.0
    }
}

/// Stable ascending sort by timestamp
pub fn sort_trades(trades: &mut [Trade]) {
    trades.sort_by_key(|t| t.timestamp);
}

/// A profit of exactly zero counts as a win
pub fn is_win(trade: &Trade) -> bool {
    trade.profit >= 0.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsView {
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_profit: f64,
}

impl From<&TradeStats> for StatsView {
    fn from(stats: &TradeStats) -> Self {
        let avg_profit = if stats.avg_profit == 0.0 && stats.total_trades > 0 {
            stats.total_pnl / stats.total_trades as f64
        } else {
            stats.avg_profit
        };
        Self {
            total_trades: stats.total_trades,
            winning_trades: stats.winning_trades,
            losing_trades: stats.losing_trades,
            win_rate: win_rate(stats.winning_trades, stats.total_trades),
            total_pnl: stats.total_pnl,
            avg_profit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub strategy: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_trades: u64,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub max_pnl: f64,
    pub stop_reason: Option<String>,
}

impl From<&Session> for SessionRow {
    fn from(session: &Session) -> Self {
        Self {
            strategy: session.strategy.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            total_trades: session.total_trades,
            win_rate: win_rate(session.winning_trades, session.total_trades),
            total_pnl: session.total_pnl,
            max_pnl: session.max_pnl,
            stop_reason: session.stop_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PnlPoint {
    pub timestamp: DateTime<Utc>,
    /// Server-reported running total, never recomputed here
    pub total_pnl: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfitBar {
    /// 1-based position in the sorted trade list (`#n`)
    pub label: String,
    pub profit: f64,
    pub positive: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSeries {
    pub pnl: Vec<PnlPoint>,
    pub wins: usize,
    pub losses: usize,
    pub profit_bars: Vec<ProfitBar>,
}

impl ChartSeries {
    /// Build every series from trades already sorted ascending
    pub fn from_sorted(trades: &[Trade]) -> Self {
        let pnl = trades
            .iter()
            .map(|t| PnlPoint {
                timestamp: t.timestamp,
                total_pnl: t.total_pnl,
            })
            .collect();

        let wins = trades.iter().filter(|t| is_win(t)).count();
        let losses = trades.len() - wins;

        let first = trades.len().saturating_sub(PROFIT_WINDOW);
        let profit_bars = trades[first..]
            .iter()
            .enumerate()
            .map(|(i, t)| ProfitBar {
                label: format!("#{}", first + i + 1),
                profit: t.profit,
                positive: t.profit >= 0.0,
            })
            .collect();

        Self {
            pnl,
            wins,
            losses,
            profit_bars,
        }
    }
}

// ============================================================================
// Aggregator
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub stats: PanelState<StatsView>,
    pub trades: PanelState<Vec<Trade>>,
    pub sessions: PanelState<Vec<SessionRow>>,
    pub charts: PanelState<ChartSeries>,
}

#[derive(Clone)]
pub struct TelemetryAggregator {
    api: Arc<dyn ConsoleApi>,
    port: Arc<dyn RenderPort>,
    controls: ControlSet,
    log: LogConsole,
    trades_limit: usize,
    sessions_limit: usize,
    filter: Arc<Mutex<Option<String>>>,
    generation: Arc<AtomicU64>,
    snapshot: Arc<Mutex<TelemetrySnapshot>>,
}

impl TelemetryAggregator {
    pub fn new(
        api: Arc<dyn ConsoleApi>,
        port: Arc<dyn RenderPort>,
        controls: ControlSet,
        log: LogConsole,
        trades_limit: usize,
        sessions_limit: usize,
    ) -> Self {
        Self {
            api,
            port,
            controls,
            log,
            trades_limit,
            sessions_limit,
            filter: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            snapshot: Arc::new(Mutex::new(TelemetrySnapshot::default())),
        }
    }

    fn snapshot_lock(&self) -> MutexGuard<'_, TelemetrySnapshot> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.snapshot_lock().clone()
    }

    pub fn filter(&self) -> Option<String> {
        self.filter.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Pull stats, trades and sessions concurrently; failures stay per panel
    pub async fn refresh_all(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let filter = self.filter();
        let filter = filter.as_deref();
        debug!(filter = ?filter, generation, "Refreshing telemetry");

        tokio::join!(
            self.pull_stats(generation, filter),
            self.pull_trades(generation, filter),
            self.pull_sessions(generation),
        );
    }

    /// Lock the snapshot for a pull of `generation`; `None` once a newer refresh started
    fn snapshot_for(&self, generation: u64, panel: &str) -> Option<MutexGuard<'_, TelemetrySnapshot>> {
        let snapshot = self.snapshot_lock();
        let current = self.generation.load(Ordering::SeqCst);
        if current != generation {
            debug!(panel, generation, current, "Dropping superseded telemetry pull");
            return None;
        }
        Some(snapshot)
    }

    /// Operator-triggered refresh, guarded against double submission
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.controls.acquire(Control::Refresh)?;
        self.refresh_all().await;
        Ok(())
    }

    /// Restrict stats and trades to one strategy (`None` clears), then refresh
    pub async fn set_filter(&self, filter: Option<String>) {
        let filter = filter.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        *self.filter.lock().unwrap_or_else(|e| e.into_inner()) = filter.clone();
        info!(filter = ?filter, "Telemetry filter changed");
        self.port.filter_changed(filter.as_deref());
        self.refresh_all().await;
    }

    /// Step the filter through: all, each built-in strategy, all
    pub async fn cycle_filter(&self) {
        let next = next_filter(self.filter().as_deref());
        self.set_filter(next.map(str::to_string)).await;
    }

    async fn pull_stats(&self, generation: u64, filter: Option<&str>) {
        let state = match self.api.stats(filter).await {
            Ok(stats) => PanelState::Loaded(StatsView::from(&stats)),
            Err(e) => {
                warn!(error = %e, "Stats pull failed");
                PanelState::Failed(e.to_string())
            }
        };
        let Some(mut snapshot) = self.snapshot_for(generation, "stats") else {
            return;
        };
        snapshot.stats = state;
        self.port.stats_changed(&snapshot.stats);
    }

    async fn pull_trades(&self, generation: u64, filter: Option<&str>) {
        let result = self.api.trades(filter, self.trades_limit).await;
        let Some(mut snapshot) = self.snapshot_for(generation, "trades") else {
            return;
        };
        match result {
            Ok(mut trades) => {
                sort_trades(&mut trades);
                snapshot.charts = PanelState::Loaded(ChartSeries::from_sorted(&trades));
                snapshot.trades = PanelState::Loaded(trades);
            }
            Err(e) => {
                warn!(error = %e, "Trades pull failed");
                snapshot.trades = PanelState::Failed(e.to_string());
                snapshot.charts = PanelState::Failed(e.to_string());
            }
        }
        self.port.trades_changed(&snapshot.trades);
        self.port.charts_changed(&snapshot.charts);
    }

    async fn pull_sessions(&self, generation: u64) {
        let state = match self.api.sessions(self.sessions_limit).await {
            Ok(sessions) => PanelState::Loaded(sessions.iter().map(SessionRow::from).collect()),
            Err(e) => {
                warn!(error = %e, "Sessions pull failed");
                PanelState::Failed(e.to_string())
            }
        };
        let Some(mut snapshot) = self.snapshot_for(generation, "sessions") else {
            return;
        };
        snapshot.sessions = state;
        self.port.sessions_changed(&snapshot.sessions);
    }

    /// Write the server's CSV trade export to `path`
    pub async fn export_trades(&self, path: &std::path::Path) -> Result<()> {
        let csv = match self.api.export_trades().await {
            Ok(csv) => csv,
            Err(e) => {
                self.log.error(format!("Failed to export trades: {}", e));
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::write(path, csv).await {
            self.log.error(format!("Failed to write {}: {}", path.display(), e));
            return Err(e.into());
        }
        self.log.success(format!("Trades exported to {}", path.display()));
        Ok(())
    }

    /// Recurring refresh until shutdown is broadcast
    pub fn spawn_auto_refresh(
        &self,
        every: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let aggregator = self.clone();
        tokio::spawn(async move {
            info!(interval_secs = every.as_secs(), "Auto refresh started");
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(every) => {
                        aggregator.refresh_all().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Auto refresh shutting down");
                        break;
                    }
                }
            }
        })
    }
}

fn next_filter(current: Option<&str>) -> Option<&'static str> {
    match current {
        None => BUILTIN_STRATEGIES.first().copied(),
        Some(name) => match BUILTIN_STRATEGIES.iter().position(|s| *s == name) {
            Some(i) => BUILTIN_STRATEGIES.get(i + 1).copied(),
            None => None,
        },
    }
}
