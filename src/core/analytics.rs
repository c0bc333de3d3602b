//! Analytics panel: cash flow, trade report, AI analysis and strategy generation

use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::controls::{Control, ControlSet};
use super::log_console::LogConsole;
use super::render::{PanelState, RenderPort};
use super::strategy_store::{EditorView, StrategyStore};
use crate::api::{CashFlowPoint, ConsoleApi, TradeReport};
use crate::error::{AppError, Result};

/// Generation mode whose output carries the `dbot` tag
pub const DBOT_MODE: &str = "dbot";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Default)]
struct AnalyticsState {
    cash_flow: PanelState<Vec<CashFlowPoint>>,
    report: PanelState<TradeReport>,
    transcript: Vec<ChatTurn>,
}

#[derive(Clone)]
pub struct AnalyticsPanel {
    api: Arc<dyn ConsoleApi>,
    log: LogConsole,
    controls: ControlSet,
    port: Arc<dyn RenderPort>,
    strategies: StrategyStore,
    inner: Arc<Mutex<AnalyticsState>>,
}

impl AnalyticsPanel {
    pub fn new(
        api: Arc<dyn ConsoleApi>,
        log: LogConsole,
        controls: ControlSet,
        port: Arc<dyn RenderPort>,
        strategies: StrategyStore,
    ) -> Self {
        Self {
            api,
            log,
            controls,
            port,
            strategies,
            inner: Arc::new(Mutex::new(AnalyticsState::default())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AnalyticsState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn cash_flow(&self) -> PanelState<Vec<CashFlowPoint>> {
        self.lock().cash_flow.clone()
    }

    pub fn report(&self) -> PanelState<TradeReport> {
        self.lock().report.clone()
    }

    pub fn transcript(&self) -> Vec<ChatTurn> {
        self.lock().transcript.clone()
    }

    /// Pull cash flow and report together; each failure stays in its panel
    pub async fn load(&self) {
        tokio::join!(self.pull_cash_flow(), self.pull_report());
    }

    async fn pull_cash_flow(&self) {
        let state = match self.api.cash_flow().await {
            Ok(points) => PanelState::Loaded(points),
            Err(e) => {
                warn!(error = %e, "Cash flow pull failed");
                PanelState::Failed(e.to_string())
            }
        };
        let mut inner = self.lock();
        inner.cash_flow = state;
        self.port.cash_flow_changed(&inner.cash_flow);
    }

    async fn pull_report(&self) {
        let state = match self.api.trade_report().await {
            Ok(report) => PanelState::Loaded(report),
            Err(e) => {
                warn!(error = %e, "Trade report pull failed");
                PanelState::Failed(e.to_string())
            }
        };
        let mut inner = self.lock();
        inner.report = state;
        self.port.report_changed(&inner.report);
    }

    fn push_turn(&self, speaker: Speaker, text: String) {
        let mut inner = self.lock();
        inner.transcript.push(ChatTurn { speaker, text });
        self.port.transcript_changed(&inner.transcript);
    }

    /// Ask a free-text question about the trading history
    pub async fn analyze(&self, prompt: &str) -> Result<String> {
        let _guard = self.controls.acquire(Control::Analyze)?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::Validation("prompt is empty".into()));
        }
        self.push_turn(Speaker::User, prompt.to_string());
        match self.api.analyze(prompt).await {
            Ok(reply) => {
                self.push_turn(Speaker::Assistant, reply.clone());
                Ok(reply)
            }
            Err(e) => {
                self.push_turn(Speaker::Assistant, format!("Error: {}", e));
                Err(e)
            }
        }
    }

    /// Generate a script from `prompt` and load it into the editor unsaved
    pub async fn generate_strategy(&self, prompt: &str, mode: &str, model: Option<&str>) -> Result<()> {
        let _guard = self.controls.acquire(Control::Generate)?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::Validation("prompt is empty".into()));
        }
        self.log.info("Generating strategy...");
        let script = match self.api.generate_strategy(prompt, mode, model).await {
            Ok(script) => script,
            Err(e) => {
                self.log.error(format!("Failed to generate strategy: {}", e));
                return Err(e);
            }
        };
        let tags = if mode == DBOT_MODE {
            vec![DBOT_MODE.to_string()]
        } else {
            Vec::new()
        };
        self.strategies.set_editor(EditorView {
            current: None,
            content: script,
            tags,
        });
        info!(mode = %mode, "Strategy generated");
        self.log.success("Strategy generated and loaded into the editor");
        Ok(())
    }

    /// Write the server's log archive to `path`
    pub async fn download_logs(&self, path: &Path) -> Result<()> {
        let text = match self.api.download_logs().await {
            Ok(text) => text,
            Err(e) => {
                self.log.error(format!("Failed to download logs: {}", e));
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::write(path, text).await {
            self.log.error(format!("Failed to write {}: {}", path.display(), e));
            return Err(e.into());
        }
        self.log.success(format!("Logs saved to {}", path.display()));
        Ok(())
    }
}
