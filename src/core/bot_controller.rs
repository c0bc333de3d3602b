//! Bot lifecycle controller
//!
//! The authoritative state is binary (`Stopped`/`Running`). Both controls stay
//! disabled until the first status check returns, and while a start or stop
//! call is in flight; otherwise exactly one of them is enabled. The runtime clock is a single owned task, aborted on
//! every stop and before every (re)start.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::bot_form::BotForm;
use super::controls::{Control, ControlSet};
use super::log_console::LogConsole;
use super::render::RenderPort;
use crate::api::{BotConfig, ConsoleApi};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Stopped,
    Running,
}

/// Everything the display needs to show the bot's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotView {
    pub state: BotState,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    /// Form inputs are read-only
    pub inputs_locked: bool,
}

/// Render an elapsed duration as `HH:MM:SS` (hours may exceed 99)
pub fn format_runtime(elapsed_secs: i64) -> String {
    let secs = elapsed_secs.max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub const BLANK_RUNTIME: &str = "-";

struct ControllerState {
    state: BotState,
    in_flight: bool,
    /// The server's status has been checked at least once
    reconciled: bool,
    started_at: Option<i64>,
    clock: Option<JoinHandle<()>>,
    form: BotForm,
}

impl ControllerState {
    fn view(&self) -> BotView {
        let idle = self.reconciled && !self.in_flight;
        BotView {
            state: self.state,
            start_enabled: idle && self.state == BotState::Stopped,
            stop_enabled: idle && self.state == BotState::Running,
            inputs_locked: !idle || self.state == BotState::Running,
        }
    }
}

/// Log texts for one flavour of start command
struct StartMessages {
    starting: String,
    started: &'static str,
}

#[derive(Clone)]
pub struct BotController {
    api: Arc<dyn ConsoleApi>,
    log: LogConsole,
    controls: ControlSet,
    port: Arc<dyn RenderPort>,
    tick: Duration,
    inner: Arc<Mutex<ControllerState>>,
}

impl BotController {
    pub fn new(
        api: Arc<dyn ConsoleApi>,
        log: LogConsole,
        controls: ControlSet,
        port: Arc<dyn RenderPort>,
        form_defaults: BotConfig,
    ) -> Self {
        let controller = Self {
            api,
            log,
            controls,
            port,
            tick: Duration::from_secs(1),
            inner: Arc::new(Mutex::new(ControllerState {
                state: BotState::Stopped,
                in_flight: false,
                reconciled: false,
                started_at: None,
                clock: None,
                form: BotForm::new(form_defaults),
            })),
        };
        let inner = controller.lock();
        controller.publish(&inner);
        drop(inner);
        controller
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> BotState {
        self.lock().state
    }

    pub fn view(&self) -> BotView {
        self.lock().view()
    }

    pub fn form(&self) -> BotForm {
        self.lock().form.clone()
    }

    /// Server-reported start time of the current run (epoch seconds)
    pub fn started_at(&self) -> Option<i64> {
        self.lock().started_at
    }

    /// Current runtime text; `-` while stopped
    pub fn runtime(&self) -> String {
        match self.lock().started_at {
            Some(start) => format_runtime(Utc::now().timestamp() - start),
            None => BLANK_RUNTIME.to_string(),
        }
    }

    /// Edit one form field; rejected while inputs are locked
    pub fn update_form(&self, field: &str, value: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.view().inputs_locked {
            return Err(AppError::Validation(
                "settings are locked while the bot is running".into(),
            ));
        }
        inner.form.set(field, value)?;
        info!(field = %field, value = %value, "Start form updated");
        Ok(())
    }

    /// Start the bot from the current form values
    pub async fn start(&self) -> Result<()> {
        let built = self.lock().form.build();
        let config = match built {
            Ok(config) => config,
            Err(e) => {
                self.log.error(format!("Invalid bot configuration: {}", e));
                return Err(e);
            }
        };
        let messages = StartMessages {
            starting: format!("Starting bot with strategy: {}...", config.strategy),
            started: "Bot started successfully",
        };
        self.start_with(config, messages).await
    }

    /// Start the `custom` strategy with `script` (the editor contents)
    pub async fn run_script(&self, script: &str) -> Result<()> {
        let _guard = self.controls.acquire(Control::RunScript)?;
        let built = self.lock().form.build_with_script(script);
        let config = match built {
            Ok(config) => config,
            Err(e) => {
                self.log.error(format!("Invalid bot configuration: {}", e));
                return Err(e);
            }
        };
        let messages = StartMessages {
            starting: "Starting Custom Strategy...".to_string(),
            started: "Custom Strategy started",
        };
        self.start_with(config, messages).await
    }

    async fn start_with(&self, config: BotConfig, messages: StartMessages) -> Result<()> {
        {
            let mut inner = self.lock();
            if !inner.view().start_enabled {
                return Err(AppError::ControlDisabled(Control::Start.label().to_string()));
            }
            inner.in_flight = true;
            self.publish(&inner);
        }
        self.log.info(messages.starting);

        let result = self.api.start_bot(&config).await;

        let mut inner = self.lock();
        inner.in_flight = false;
        match result {
            Ok(()) => {
                let now = Utc::now().timestamp();
                self.enter_running(&mut inner, now);
                self.publish(&inner);
                drop(inner);
                info!(strategy = %config.strategy, symbol = %config.symbol, "Bot started");
                self.log.success(messages.started);
                Ok(())
            }
            Err(e) => {
                self.publish(&inner);
                drop(inner);
                warn!(error = %e, "Start rejected");
                self.log.error(format!("Failed to start bot: {}", e));
                Err(e)
            }
        }
    }

    pub async fn stop(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            if !inner.view().stop_enabled {
                return Err(AppError::ControlDisabled(Control::Stop.label().to_string()));
            }
            inner.in_flight = true;
            self.publish(&inner);
        }
        self.log.info("Stopping bot...");

        let result = self.api.stop_bot().await;

        let mut inner = self.lock();
        inner.in_flight = false;
        match result {
            Ok(()) => {
                self.enter_stopped(&mut inner);
                self.publish(&inner);
                drop(inner);
                info!("Bot stopped");
                self.log.system("Bot stopped");
                Ok(())
            }
            Err(e) => {
                self.publish(&inner);
                drop(inner);
                warn!(error = %e, "Stop rejected");
                self.log.error(format!("Failed to stop bot: {}", e));
                Err(e)
            }
        }
    }

    /// Reconcile local state with the server without sending any command
    ///
    /// Skipped while a start/stop call is in flight; that call's outcome wins.
    /// The first call unlocks the controls, even when the check fails.
    pub async fn check_status(&self) -> Result<BotState> {
        let status = match self.api.bot_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Bot status check failed");
                let mut inner = self.lock();
                if !inner.reconciled {
                    inner.reconciled = true;
                    self.publish(&inner);
                }
                return Err(e);
            }
        };

        let mut inner = self.lock();
        let first = !inner.reconciled;
        inner.reconciled = true;
        if inner.in_flight {
            return Ok(inner.state);
        }
        match (inner.state, status.running) {
            (BotState::Stopped, true) => {
                let start = status
                    .start_time_epoch_secs
                    .unwrap_or_else(|| Utc::now().timestamp());
                self.enter_running(&mut inner, start);
                self.publish(&inner);
                drop(inner);
                info!(started_at = start, "Bot already running on server");
                self.log.system("Synced bot status: Running");
                Ok(BotState::Running)
            }
            (BotState::Running, false) => {
                self.enter_stopped(&mut inner);
                self.publish(&inner);
                drop(inner);
                info!("Bot no longer running on server");
                self.log.system("Synced bot status: Stopped");
                Ok(BotState::Stopped)
            }
            (BotState::Running, true) => {
                if let Some(start) = status.start_time_epoch_secs {
                    if inner.started_at != Some(start) {
                        self.enter_running(&mut inner, start);
                    }
                }
                if first {
                    self.publish(&inner);
                }
                Ok(BotState::Running)
            }
            (BotState::Stopped, false) => {
                if first {
                    self.publish(&inner);
                }
                Ok(BotState::Stopped)
            }
        }
    }

    /// Abort the runtime clock (console teardown)
    pub fn shutdown(&self) {
        if let Some(clock) = self.lock().clock.take() {
            clock.abort();
        }
    }

    fn enter_running(&self, inner: &mut ControllerState, started_at: i64) {
        inner.state = BotState::Running;
        inner.started_at = Some(started_at);
        if let Some(clock) = inner.clock.take() {
            clock.abort();
        }
        self.port
            .runtime_tick(&format_runtime(Utc::now().timestamp() - started_at));

        let port = self.port.clone();
        let tick = self.tick;
        inner.clock = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                port.runtime_tick(&format_runtime(Utc::now().timestamp() - started_at));
            }
        }));
    }

    fn enter_stopped(&self, inner: &mut ControllerState) {
        inner.state = BotState::Stopped;
        inner.started_at = None;
        if let Some(clock) = inner.clock.take() {
            clock.abort();
        }
        self.port.runtime_tick(BLANK_RUNTIME);
    }

    fn publish(&self, inner: &ControllerState) {
        let view = inner.view();
        self.controls.set(Control::Start, view.start_enabled);
        self.controls.set(Control::Stop, view.stop_enabled);
        self.port.bot_changed(&view);
    }

    #[cfg(test)]
    fn has_clock(&self) -> bool {
        self.lock().clock.as_ref().map_or(false, |c| !c.is_finished())
    }
}
