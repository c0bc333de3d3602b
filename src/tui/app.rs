//! TUI Application State
//!
//! `ViewState` is everything the screen shows. It is filled by [`TuiPort`],
//! the render port handed to the console components, and read by the draw
//! loop. Wrapped in Arc<Mutex<>> for sharing between tasks.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::{
    BotConfig, CashFlowPoint, JournalEntry, Settings, Strategy, Trade, TradeReport,
};
use crate::core::{
    BotState, BotView, ChartSeries, ChatTurn, ConnectionState, Control, EditorView, LogEntry,
    PanelState, RenderPort, SessionRow, StatsView, Theme, BLANK_RUNTIME,
};

/// Console views, in `Tab` order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Strategies,
    Journal,
    Analytics,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Dashboard, Tab::Strategies, Tab::Journal, Tab::Analytics];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Strategies => "Strategies",
            Tab::Journal => "Journal",
            Tab::Analytics => "Analytics",
        }
    }

    pub fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

/// Developer trace line captured by `TuiLayer`
#[derive(Clone, Debug)]
pub struct DevLogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ViewState {
    // Connection & bot
    pub connection: ConnectionState,
    pub bot: BotView,
    pub runtime: String,
    pub controls: HashMap<Control, bool>,
    pub form: BotConfig,

    // Operator log (mirror of the LogConsole ring)
    pub logs: VecDeque<LogEntry>,
    pub log_scroll_offset: usize,

    // Telemetry
    pub stats: PanelState<StatsView>,
    pub trades: PanelState<Vec<Trade>>,
    pub sessions: PanelState<Vec<SessionRow>>,
    pub charts: PanelState<ChartSeries>,
    pub filter: Option<String>,

    // Strategies & journal
    pub strategies: PanelState<Vec<Strategy>>,
    pub editor: EditorView,
    pub journal: PanelState<Vec<JournalEntry>>,

    // Analytics
    pub cash_flow: PanelState<Vec<CashFlowPoint>>,
    pub report: PanelState<TradeReport>,
    pub transcript: Vec<ChatTurn>,

    // Settings
    pub settings: Settings,
    pub setup_required: bool,
    pub guide_visible: bool,
    pub theme: Theme,

    // Developer pane (ring buffer)
    pub dev_logs: VecDeque<DevLogEntry>,
    dev_capacity: usize,
    pub dropped_dev_logs: u64,
    pub show_dev_pane: bool,

    // Control
    pub tab: Tab,
    /// Command line buffer while `:` mode is active
    pub command: Option<String>,
    pub command_error: Option<String>,
    pub should_quit: bool,
    pub reload_requested: bool,
}

impl ViewState {
    pub fn new(dev_capacity: usize) -> Self {
        Self {
            connection: ConnectionState::Connecting,
            bot: BotView {
                state: BotState::Stopped,
                start_enabled: true,
                stop_enabled: false,
                inputs_locked: false,
            },
            runtime: BLANK_RUNTIME.to_string(),
            controls: HashMap::new(),
            form: BotConfig::default(),
            logs: VecDeque::new(),
            log_scroll_offset: 0,
            stats: PanelState::Loading,
            trades: PanelState::Loading,
            sessions: PanelState::Loading,
            charts: PanelState::Loading,
            filter: None,
            strategies: PanelState::Loading,
            editor: EditorView::default(),
            journal: PanelState::Loading,
            cash_flow: PanelState::Loading,
            report: PanelState::Loading,
            transcript: Vec::new(),
            settings: Settings::default(),
            setup_required: false,
            guide_visible: false,
            theme: Theme::Dark,
            dev_logs: VecDeque::with_capacity(dev_capacity),
            dev_capacity,
            dropped_dev_logs: 0,
            show_dev_pane: false,
            tab: Tab::Dashboard,
            command: None,
            command_error: None,
            should_quit: false,
            reload_requested: false,
        }
    }

    /// Add a developer trace with automatic rotation
    pub fn push_dev_log(&mut self, entry: DevLogEntry) {
        if self.dev_logs.len() >= self.dev_capacity {
            self.dev_logs.pop_front();
        }
        self.dev_logs.push_back(entry);
    }

    /// Unknown controls count as enabled until the console reports otherwise
    pub fn control_enabled(&self, control: Control) -> bool {
        self.controls.get(&control).copied().unwrap_or(true)
    }
}

/// Render port that writes into the shared [`ViewState`]
#[derive(Clone)]
pub struct TuiPort {
    state: Arc<Mutex<ViewState>>,
}

impl TuiPort {
    pub fn new(state: Arc<Mutex<ViewState>>) -> Self {
        Self { state }
    }

    fn view(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RenderPort for TuiPort {
    fn connection_changed(&self, state: ConnectionState) {
        self.view().connection = state;
    }

    fn bot_changed(&self, view: &BotView) {
        self.view().bot = *view;
    }

    fn runtime_tick(&self, runtime: &str) {
        self.view().runtime = runtime.to_string();
    }

    fn control_changed(&self, control: Control, enabled: bool) {
        self.view().controls.insert(control, enabled);
    }

    fn log_appended(&self, entry: &LogEntry, evicted: usize) {
        let mut view = self.view();
        for _ in 0..evicted {
            view.logs.pop_front();
        }
        view.logs.push_back(entry.clone());
    }

    fn log_cleared(&self) {
        let mut view = self.view();
        view.logs.clear();
        view.log_scroll_offset = 0;
    }

    fn stats_changed(&self, stats: &PanelState<StatsView>) {
        self.view().stats = stats.clone();
    }

    fn trades_changed(&self, trades: &PanelState<Vec<Trade>>) {
        self.view().trades = trades.clone();
    }

    fn sessions_changed(&self, sessions: &PanelState<Vec<SessionRow>>) {
        self.view().sessions = sessions.clone();
    }

    fn charts_changed(&self, charts: &PanelState<ChartSeries>) {
        self.view().charts = charts.clone();
    }

    fn filter_changed(&self, filter: Option<&str>) {
        self.view().filter = filter.map(str::to_string);
    }

    fn strategies_changed(&self, strategies: &PanelState<Vec<Strategy>>) {
        self.view().strategies = strategies.clone();
    }

    fn editor_changed(&self, editor: &EditorView) {
        self.view().editor = editor.clone();
    }

    fn journal_changed(&self, entries: &PanelState<Vec<JournalEntry>>) {
        self.view().journal = entries.clone();
    }

    fn cash_flow_changed(&self, points: &PanelState<Vec<CashFlowPoint>>) {
        self.view().cash_flow = points.clone();
    }

    fn report_changed(&self, report: &PanelState<TradeReport>) {
        self.view().report = report.clone();
    }

    fn transcript_changed(&self, turns: &[ChatTurn]) {
        self.view().transcript = turns.to_vec();
    }

    fn settings_changed(&self, settings: &Settings) {
        self.view().settings = settings.clone();
    }

    fn setup_changed(&self, required: bool) {
        self.view().setup_required = required;
    }

    fn guide_changed(&self, visible: bool) {
        self.view().guide_visible = visible;
    }

    fn theme_changed(&self, theme: Theme) {
        self.view().theme = theme;
    }

    fn reload_requested(&self) {
        self.view().reload_requested = true;
    }
}
