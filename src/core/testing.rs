//! Test doubles shared by the component tests

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::stream::{self, StreamExt};

use super::analytics::ChatTurn;
use super::bot_controller::BotView;
use super::connection::{ConnectionState, FrameStream, TelemetryTransport};
use super::controls::Control;
use super::log_console::{LogEntry, LogKind};
use super::render::{PanelState, RenderPort};
use super::settings::Theme;
use super::strategy_store::EditorView;
use super::telemetry::{ChartSeries, SessionRow, StatsView};
use crate::api::{
    BotConfig, BotStatus, CashFlowPoint, ConsoleApi, JournalEntry, Session, Settings, Strategy,
    Trade, TradeReport, TradeStats,
};
use crate::error::{AppError, Result};

/// Trade at `secs` seconds past a fixed epoch
pub fn trade(secs: i64, profit: f64, total_pnl: f64) -> Trade {
    Trade {
        timestamp: at(secs),
        strategy: "rise_fall".into(),
        contract_type: "CALL".into(),
        stake: 1.0,
        profit,
        total_pnl,
        symbol: Some("R_100".into()),
        status: Some(if profit >= 0.0 { "won" } else { "lost" }.into()),
        balance: None,
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .unwrap()
}

// ============================================================================
// Recording port
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Connection(ConnectionState),
    Bot(BotView),
    Runtime(String),
    Control(Control, bool),
    Log(LogEntry, usize),
    LogCleared,
    Stats(PanelState<StatsView>),
    Trades(PanelState<Vec<Trade>>),
    Sessions(PanelState<Vec<SessionRow>>),
    Charts(PanelState<ChartSeries>),
    Filter(Option<String>),
    Strategies(PanelState<Vec<Strategy>>),
    Editor(EditorView),
    Journal(PanelState<Vec<JournalEntry>>),
    CashFlow(PanelState<Vec<CashFlowPoint>>),
    Report(PanelState<TradeReport>),
    Transcript(Vec<ChatTurn>),
    Settings(Settings),
    Setup(bool),
    Guide(bool),
    Theme(Theme),
    Reload,
}

#[derive(Default)]
pub struct RecordingPort {
    events: Mutex<Vec<Rendered>>,
}

impl RecordingPort {
    fn record(&self, event: Rendered) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Rendered> {
        self.events.lock().unwrap().clone()
    }

    pub fn log_messages(&self) -> Vec<(LogKind, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Rendered::Log(entry, _) => Some((entry.kind, entry.message)),
                _ => None,
            })
            .collect()
    }

    pub fn last_runtime(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            Rendered::Runtime(text) => Some(text),
            _ => None,
        })
    }

    pub fn runtime_ticks(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Rendered::Runtime(_)))
            .count()
    }
}

impl RenderPort for RecordingPort {
    fn connection_changed(&self, state: ConnectionState) {
        self.record(Rendered::Connection(state));
    }
    fn bot_changed(&self, view: &BotView) {
        self.record(Rendered::Bot(*view));
    }
    fn runtime_tick(&self, runtime: &str) {
        self.record(Rendered::Runtime(runtime.to_string()));
    }
    fn control_changed(&self, control: Control, enabled: bool) {
        self.record(Rendered::Control(control, enabled));
    }
    fn log_appended(&self, entry: &LogEntry, evicted: usize) {
        self.record(Rendered::Log(entry.clone(), evicted));
    }
    fn log_cleared(&self) {
        self.record(Rendered::LogCleared);
    }
    fn stats_changed(&self, stats: &PanelState<StatsView>) {
        self.record(Rendered::Stats(stats.clone()));
    }
    fn trades_changed(&self, trades: &PanelState<Vec<Trade>>) {
        self.record(Rendered::Trades(trades.clone()));
    }
    fn sessions_changed(&self, sessions: &PanelState<Vec<SessionRow>>) {
        self.record(Rendered::Sessions(sessions.clone()));
    }
    fn charts_changed(&self, charts: &PanelState<ChartSeries>) {
        self.record(Rendered::Charts(charts.clone()));
    }
    fn filter_changed(&self, filter: Option<&str>) {
        self.record(Rendered::Filter(filter.map(str::to_string)));
    }
    fn strategies_changed(&self, strategies: &PanelState<Vec<Strategy>>) {
        self.record(Rendered::Strategies(strategies.clone()));
    }
    fn editor_changed(&self, editor: &EditorView) {
        self.record(Rendered::Editor(editor.clone()));
    }
    fn journal_changed(&self, entries: &PanelState<Vec<JournalEntry>>) {
        self.record(Rendered::Journal(entries.clone()));
    }
    fn cash_flow_changed(&self, points: &PanelState<Vec<CashFlowPoint>>) {
        self.record(Rendered::CashFlow(points.clone()));
    }
    fn report_changed(&self, report: &PanelState<TradeReport>) {
        self.record(Rendered::Report(report.clone()));
    }
    fn transcript_changed(&self, turns: &[ChatTurn]) {
        self.record(Rendered::Transcript(turns.to_vec()));
    }
    fn settings_changed(&self, settings: &Settings) {
        self.record(Rendered::Settings(settings.clone()));
    }
    fn setup_changed(&self, required: bool) {
        self.record(Rendered::Setup(required));
    }
    fn guide_changed(&self, visible: bool) {
        self.record(Rendered::Guide(visible));
    }
    fn theme_changed(&self, theme: Theme) {
        self.record(Rendered::Theme(theme));
    }
    fn reload_requested(&self) {
        self.record(Rendered::Reload);
    }
}

// ============================================================================
// Mock API
// ============================================================================

#[derive(Default)]
struct MockState {
    calls: HashMap<&'static str, usize>,
    filters: HashMap<&'static str, Option<String>>,
    limits: HashMap<&'static str, usize>,
    rejections: HashMap<&'static str, (u16, String)>,
    latency: Duration,
    settings: Settings,
    saved_settings: Option<Settings>,
    status: BotStatus,
    last_start: Option<BotConfig>,
    stats: TradeStats,
    stats_by_filter: HashMap<String, TradeStats>,
    trades: Vec<Trade>,
    sessions: Vec<Session>,
    strategies: BTreeMap<String, (String, Vec<String>)>,
    journal: Vec<JournalEntry>,
    journal_seq: usize,
}

/// In-memory bot server
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn calls(&self, op: &str) -> usize {
        self.with(|s| s.calls.get(op).copied().unwrap_or(0))
    }

    /// Fail `op` with a non-2xx response until cleared
    pub fn reject(&self, op: &'static str, status: u16, body: &str) {
        self.with(|s| s.rejections.insert(op, (status, body.to_string())));
    }

    pub fn clear_rejections(&self) {
        self.with(|s| s.rejections.clear());
    }

    pub fn set_latency(&self, latency: Duration) {
        self.with(|s| s.latency = latency);
    }

    pub fn set_status(&self, status: BotStatus) {
        self.with(|s| s.status = status);
    }

    pub fn set_settings(&self, settings: Settings) {
        self.with(|s| s.settings = settings);
    }

    pub fn set_stats(&self, stats: TradeStats) {
        self.with(|s| s.stats = stats);
    }

    /// Stats served when the pull is filtered to `filter`
    pub fn set_stats_for(&self, filter: &str, stats: TradeStats) {
        self.with(|s| s.stats_by_filter.insert(filter.to_string(), stats));
    }

    pub fn set_trades(&self, trades: Vec<Trade>) {
        self.with(|s| s.trades = trades);
    }

    pub fn set_sessions(&self, sessions: Vec<Session>) {
        self.with(|s| s.sessions = sessions);
    }

    pub fn saved_settings(&self) -> Option<Settings> {
        self.with(|s| s.saved_settings.clone())
    }

    pub fn last_start(&self) -> Option<BotConfig> {
        self.with(|s| s.last_start.clone())
    }

    pub fn last_filter(&self, op: &str) -> Option<Option<String>> {
        self.with(|s| s.filters.get(op).cloned())
    }

    pub fn last_limit(&self, op: &str) -> Option<usize> {
        self.with(|s| s.limits.get(op).copied())
    }

    async fn enter(&self, op: &'static str) -> Result<()> {
        let (latency, rejection) = self.with(|s| {
            *s.calls.entry(op).or_insert(0) += 1;
            (s.latency, s.rejections.get(op).cloned())
        });
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match rejection {
            Some((status, body)) => Err(AppError::Server { status, body }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ConsoleApi for MockApi {
    async fn settings(&self) -> Result<Settings> {
        self.enter("settings").await?;
        Ok(self.with(|s| s.settings.clone()))
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.enter("save_settings").await?;
        self.with(|s| {
            s.settings = settings.clone();
            s.saved_settings = Some(settings.clone());
        });
        Ok(())
    }

    async fn stats(&self, filter: Option<&str>) -> Result<TradeStats> {
        self.with(|s| s.filters.insert("stats", filter.map(str::to_string)));
        self.enter("stats").await?;
        Ok(self.with(|s| {
            filter
                .and_then(|f| s.stats_by_filter.get(f).cloned())
                .unwrap_or_else(|| s.stats.clone())
        }))
    }

    async fn trades(&self, filter: Option<&str>, limit: usize) -> Result<Vec<Trade>> {
        self.with(|s| {
            s.filters.insert("trades", filter.map(str::to_string));
            s.limits.insert("trades", limit);
        });
        self.enter("trades").await?;
        Ok(self.with(|s| s.trades.clone()))
    }

    async fn sessions(&self, limit: usize) -> Result<Vec<Session>> {
        self.with(|s| s.limits.insert("sessions", limit));
        self.enter("sessions").await?;
        Ok(self.with(|s| s.sessions.clone()))
    }

    async fn bot_status(&self) -> Result<BotStatus> {
        self.enter("bot_status").await?;
        Ok(self.with(|s| s.status))
    }

    async fn start_bot(&self, config: &BotConfig) -> Result<()> {
        self.with(|s| s.last_start = Some(config.clone()));
        self.enter("start_bot").await
    }

    async fn stop_bot(&self) -> Result<()> {
        self.enter("stop_bot").await
    }

    async fn list_strategies(&self) -> Result<Vec<Strategy>> {
        self.enter("list_strategies").await?;
        Ok(self.with(|s| {
            s.strategies
                .iter()
                .map(|(name, (_, tags))| Strategy {
                    name: name.clone(),
                    tags: tags.clone(),
                })
                .collect()
        }))
    }

    async fn get_strategy(&self, name: &str) -> Result<String> {
        self.enter("get_strategy").await?;
        self.with(|s| s.strategies.get(name).map(|(content, _)| content.clone()))
            .ok_or_else(|| AppError::Server {
                status: 404,
                body: "strategy not found".into(),
            })
    }

    async fn save_strategy(&self, name: &str, content: &str, tags: &[String]) -> Result<String> {
        self.enter("save_strategy").await?;
        self.with(|s| {
            s.strategies
                .insert(name.to_string(), (content.to_string(), tags.to_vec()))
        });
        Ok(name.to_string())
    }

    async fn delete_strategy(&self, name: &str) -> Result<()> {
        self.enter("delete_strategy").await?;
        self.with(|s| s.strategies.remove(name));
        Ok(())
    }

    async fn list_journal(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        self.with(|s| s.limits.insert("list_journal", limit));
        self.enter("list_journal").await?;
        Ok(self.with(|s| s.journal.iter().take(limit).cloned().collect()))
    }

    async fn create_journal(&self, title: &str, content: &str, tags: &[String]) -> Result<()> {
        self.enter("create_journal").await?;
        self.with(|s| {
            s.journal_seq += 1;
            let entry = JournalEntry {
                id: format!("j{}", s.journal_seq),
                title: title.to_string(),
                content: content.to_string(),
                tags: tags.to_vec(),
                created_at: Utc::now(),
            };
            s.journal.insert(0, entry);
        });
        Ok(())
    }

    async fn delete_journal(&self, id: &str) -> Result<()> {
        self.enter("delete_journal").await?;
        self.with(|s| s.journal.retain(|e| e.id != id));
        Ok(())
    }

    async fn cash_flow(&self) -> Result<Vec<CashFlowPoint>> {
        self.enter("cash_flow").await?;
        Ok(vec![CashFlowPoint {
            timestamp: at(0),
            balance: 1000.0,
        }])
    }

    async fn trade_report(&self) -> Result<TradeReport> {
        self.enter("trade_report").await?;
        Ok(TradeReport::default())
    }

    async fn analyze(&self, prompt: &str) -> Result<String> {
        self.enter("analyze").await?;
        Ok(format!("analysis: {}", prompt))
    }

    async fn generate_strategy(&self, prompt: &str, mode: &str, _model: Option<&str>) -> Result<String> {
        self.enter("generate_strategy").await?;
        Ok(format!("// generated ({})\n// {}\nfunction onTick(quote) {{}}\n", mode, prompt))
    }

    async fn export_trades(&self) -> Result<String> {
        self.enter("export_trades").await?;
        Ok("id,strategy,symbol,profit\n1,rise_fall,R_100,0.95\n".to_string())
    }

    async fn download_logs(&self) -> Result<String> {
        self.enter("download_logs").await?;
        Ok("12:00:00 session started\n".to_string())
    }
}

// ============================================================================
// Mock transport
// ============================================================================

enum TransportMode {
    Failing,
    /// Deliver frames, then stay open
    Frames(Vec<String>),
}

pub struct MockTransport {
    mode: TransportMode,
    opens: AtomicUsize,
}

impl MockTransport {
    pub fn failing() -> Self {
        Self {
            mode: TransportMode::Failing,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn idle() -> Self {
        Self::with_frames(Vec::new())
    }

    pub fn with_frames(frames: Vec<String>) -> Self {
        Self {
            mode: TransportMode::Frames(frames),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetryTransport for MockTransport {
    async fn open(&self, _url: &str) -> Result<FrameStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            TransportMode::Failing => Err(AppError::from(
                tokio_tungstenite::tungstenite::Error::ConnectionClosed,
            )),
            TransportMode::Frames(frames) => {
                let frames: Vec<Result<String>> = frames.iter().cloned().map(Ok).collect();
                Ok(stream::iter(frames).chain(stream::pending()).boxed())
            }
        }
    }
}
