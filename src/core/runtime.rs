//! Console runtime: wires every component and runs operator actions
//!
//! Each action runs as its own tracked task so a slow request never blocks
//! rendering or other actions. Until [`Console::initialize`] has reconciled the
//! bot status and checked the settings, every action except the purely local
//! ones waits for it. Failures are already reported to the operator
//! log by the component that hit them; the runtime only traces them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::analytics::AnalyticsPanel;
use super::bot_controller::BotController;
use super::channels::Action;
use super::connection::{channel_url, ConnectionManager, TelemetryTransport};
use super::controls::ControlSet;
use super::journal::JournalManager;
use super::log_console::LogConsole;
use super::render::RenderPort;
use super::settings::{PreferenceStore, SettingsManager};
use super::strategy_store::StrategyStore;
use super::telemetry::TelemetryAggregator;
use crate::api::ConsoleApi;
use crate::config::ConsoleConfig;
use crate::error::{AppError, Result};

/// Upper bound on waiting for in-flight actions at shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Starting,
    Ready,
    Closed,
}

#[derive(Clone)]
pub struct Console {
    pub log: LogConsole,
    pub controls: ControlSet,
    pub connection: ConnectionManager,
    pub bot: BotController,
    pub telemetry: TelemetryAggregator,
    pub strategies: StrategyStore,
    pub settings: SettingsManager,
    pub journal: JournalManager,
    pub analytics: AnalyticsPanel,
    refresh_interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
    readiness: Arc<watch::Sender<Readiness>>,
    tracker: TaskTracker,
}

impl Console {
    pub fn new(
        config: &ConsoleConfig,
        api: Arc<dyn ConsoleApi>,
        transport: Arc<dyn TelemetryTransport>,
        port: Arc<dyn RenderPort>,
    ) -> Result<Self> {
        let url = channel_url(&config.server_url)?;
        let log = LogConsole::new(config.log_capacity, port.clone());
        let controls = ControlSet::new(port.clone());

        let connection = ConnectionManager::new(
            url,
            config.reconnect_delay(),
            transport,
            log.clone(),
            port.clone(),
        );
        let bot = BotController::new(
            api.clone(),
            log.clone(),
            controls.clone(),
            port.clone(),
            config.bot.clone(),
        );
        let telemetry = TelemetryAggregator::new(
            api.clone(),
            port.clone(),
            controls.clone(),
            log.clone(),
            config.trades_limit,
            config.sessions_limit,
        );
        let strategies = StrategyStore::new(api.clone(), log.clone(), controls.clone(), port.clone());
        let prefs = Arc::new(PreferenceStore::load(config.preferences_file()));
        let settings = SettingsManager::new(
            api.clone(),
            log.clone(),
            controls.clone(),
            port.clone(),
            prefs,
            telemetry.clone(),
        );
        let journal = JournalManager::new(
            api.clone(),
            log.clone(),
            controls.clone(),
            port.clone(),
            config.journal_limit,
        );
        let analytics = AnalyticsPanel::new(api, log.clone(), controls.clone(), port, strategies.clone());
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            log,
            controls,
            connection,
            bot,
            telemetry,
            strategies,
            settings,
            journal,
            analytics,
            refresh_interval: config.refresh_interval(),
            shutdown_tx,
            readiness: Arc::new(watch::Sender::new(Readiness::Starting)),
            tracker: TaskTracker::new(),
        })
    }

    /// Open the channel, pull everything once, reconcile bot status, start auto refresh
    pub async fn initialize(&self) {
        info!(channel = %self.connection.url(), "Initializing console");
        self.connection.connect();

        let (_, status, strategies, setup, journal) = tokio::join!(
            self.telemetry.refresh_all(),
            self.bot.check_status(),
            self.strategies.list(),
            self.settings.check_setup(),
            self.journal.list(),
        );
        if let Err(e) = status {
            self.log.error(format!("Failed to fetch bot status: {}", e));
        }
        if let Err(e) = setup {
            self.log.error(format!("Failed to load settings: {}", e));
        }
        if let Err(e) = strategies {
            debug!(error = %e, "Initial strategy list failed");
        }
        if let Err(e) = journal {
            debug!(error = %e, "Initial journal list failed");
        }
        self.readiness.send_if_modified(|state| {
            if *state == Readiness::Starting {
                *state = Readiness::Ready;
                true
            } else {
                false
            }
        });

        if self.tracker.is_closed() {
            debug!("Shut down during initialization, no auto refresh");
            return;
        }
        let auto_refresh = self
            .telemetry
            .spawn_auto_refresh(self.refresh_interval, self.shutdown_tx.subscribe());
        self.tracker.spawn(async move {
            let _ = auto_refresh.await;
        });
    }

    /// [`Console::initialize`] in the background, so the display is live at once
    pub fn spawn_initialize(&self) {
        let console = self.clone();
        self.tracker.spawn(async move { console.initialize().await });
    }

    /// Run `action` in the background
    pub fn dispatch(&self, action: Action) {
        let console = self.clone();
        self.tracker.spawn(async move {
            let label = format!("{:?}", action);
            if let Err(e) = console.execute(action).await {
                debug!(action = %label, error = %e, "Action finished with error");
            }
        });
    }

    /// True once the first status and settings checks have returned
    pub fn is_ready(&self) -> bool {
        *self.readiness.borrow() == Readiness::Ready
    }

    async fn wait_ready(&self) -> Result<()> {
        let mut rx = self.readiness.subscribe();
        let state = match rx.wait_for(|state| *state != Readiness::Starting).await {
            Ok(state) => *state,
            Err(_) => Readiness::Closed,
        };
        if state == Readiness::Closed {
            return Err(AppError::ControlDisabled("Console".into()));
        }
        Ok(())
    }

    /// Run `action` to completion
    ///
    /// Waits for [`Console::initialize`] unless the action is purely local.
    pub async fn execute(&self, action: Action) -> Result<()> {
        if !action.allowed_while_starting() && !self.is_ready() {
            debug!(action = ?action, "Waiting for console initialization");
            self.wait_ready().await?;
        }
        if self.settings.setup_required() && !action.allowed_during_setup() {
            let err = AppError::Validation("complete the initial setup first".into());
            self.log.error(err.to_string());
            return Err(err);
        }

        match action {
            Action::Start => self.bot.start().await,
            Action::Stop => self.bot.stop().await,
            Action::Refresh => self.telemetry.refresh().await,
            Action::CycleFilter => {
                self.telemetry.cycle_filter().await;
                Ok(())
            }
            Action::SetFilter(filter) => {
                self.telemetry.set_filter(filter).await;
                Ok(())
            }
            Action::ClearLog => {
                self.log.clear();
                Ok(())
            }
            Action::ToggleTheme => {
                self.settings.toggle_theme();
                Ok(())
            }
            Action::SetField { field, value } => {
                let result = self.bot.update_form(&field, &value);
                if let Err(e) = &result {
                    self.log.error(e.to_string());
                }
                result
            }

            Action::NewScript => {
                self.strategies.new_script();
                Ok(())
            }
            Action::LoadStrategy(name) => self.strategies.load(&name).await,
            Action::SaveStrategy { name, tags } => {
                self.strategies.save_editor(&name, &tags).await.map(|_| ())
            }
            Action::DeleteStrategy(name) => self.strategies.delete(&name).await,
            Action::ImportScript(path) => self.strategies.import_file(&path).await,
            Action::ExportScript(path) => self.strategies.export_file(&path).await,
            Action::RunScript => {
                let script = self.strategies.editor().content;
                self.bot.run_script(&script).await
            }

            Action::CreateJournal {
                title,
                content,
                tags,
            } => self.journal.create(&title, &content, &tags).await,
            Action::DeleteJournal(id) => self.journal.delete(&id).await,

            Action::LoadAnalytics => {
                self.analytics.load().await;
                Ok(())
            }
            Action::Analyze(prompt) => self.analytics.analyze(&prompt).await.map(|_| ()),
            Action::Generate {
                prompt,
                mode,
                model,
            } => {
                self.analytics
                    .generate_strategy(&prompt, &mode, model.as_deref())
                    .await
            }
            Action::ExportTrades(path) => self.telemetry.export_trades(&path).await,
            Action::DownloadLogs(path) => self.analytics.download_logs(&path).await,

            Action::CompleteSetup { token, mongo_uri } => {
                self.settings.complete_setup(&token, &mongo_uri).await
            }
            Action::SaveSetting { key, value } => {
                let result = self.settings.save_field(&key, &value).await;
                if let Err(AppError::Validation(msg)) = &result {
                    self.log.error(msg.clone());
                }
                result
            }
            Action::ShowGuide => {
                self.settings.show_guide();
                Ok(())
            }
            Action::DismissGuide => {
                self.settings.dismiss_guide();
                Ok(())
            }
        }
    }

    /// Cancel every background task: auto refresh, channel, retry timer, runtime clock
    pub async fn shutdown(&self) {
        info!("Console shutting down");
        self.readiness.send_replace(Readiness::Closed);
        let _ = self.shutdown_tx.send(());
        self.connection.shutdown();
        self.bot.shutdown();
        self.tracker.close();
        if tokio::time::timeout(SHUTDOWN_GRACE, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(pending = self.tracker.len(), "Abandoning in-flight actions at shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BotStatus, Settings};
    use crate::core::bot_controller::BotState;
    use crate::core::connection::ConnectionState;
    use crate::core::log_console::LogKind;
    use crate::core::testing::{trade, MockApi, MockTransport, RecordingPort};

    fn config(dir: &tempfile::TempDir) -> ConsoleConfig {
        ConsoleConfig {
            preferences_path: Some(dir.path().join("preferences.json")),
            refresh_interval_secs: 3600,
            ..Default::default()
        }
    }

    fn ready_api() -> Arc<MockApi> {
        let api = Arc::new(MockApi::default());
        api.set_settings(Settings {
            api_token: "token-1234567".into(),
            ..Default::default()
        });
        api
    }

    #[tokio::test]
    async fn test_initialize_reconciles_and_pulls() {
        let dir = tempfile::tempdir().unwrap();
        let api = ready_api();
        api.set_status(BotStatus::running_since(chrono::Utc::now().timestamp() - 10));
        api.set_trades(vec![trade(2, 1.0, 1.0), trade(1, -0.5, 0.0)]);
        let port = Arc::new(RecordingPort::default());
        let transport = Arc::new(MockTransport::idle());
        let console = Console::new(&config(&dir), api.clone(), transport.clone(), port.clone()).unwrap();

        console.initialize().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(console.bot.state(), BotState::Running);
        assert_eq!(api.calls("start_bot"), 0);
        assert_eq!(api.calls("stats"), 1);
        assert_eq!(api.calls("list_strategies"), 1);
        assert_eq!(api.last_limit("sessions"), Some(10));
        assert_eq!(api.last_limit("trades"), Some(50));
        assert_eq!(transport.open_count(), 1);
        assert_eq!(console.connection.state(), ConnectionState::Connected);
        assert!(console.settings.guide_visible());

        console.shutdown().await;
    }

    #[tokio::test]
    async fn test_setup_blocks_other_actions() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(MockApi::default());
        let port = Arc::new(RecordingPort::default());
        let console =
            Console::new(&config(&dir), api.clone(), Arc::new(MockTransport::idle()), port.clone())
                .unwrap();

        console.initialize().await;
        assert!(console.settings.setup_required());
        assert!(console.execute(Action::Start).await.is_err());
        assert_eq!(api.calls("start_bot"), 0);

        console
            .execute(Action::CompleteSetup {
                token: "abc".into(),
                mongo_uri: String::new(),
            })
            .await
            .unwrap();
        console.execute(Action::Start).await.unwrap();
        assert_eq!(api.calls("start_bot"), 1);
        console.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_script_uses_editor_contents() {
        let dir = tempfile::tempdir().unwrap();
        let api = ready_api();
        let port = Arc::new(RecordingPort::default());
        let console =
            Console::new(&config(&dir), api.clone(), Arc::new(MockTransport::idle()), port.clone())
                .unwrap();
        console.initialize().await;

        console.execute(Action::RunScript).await.unwrap();
        let sent = api.last_start().unwrap();
        assert_eq!(sent.strategy, "custom");
        assert!(sent.script.unwrap().starts_with("// Custom Strategy Script"));
        assert!(port
            .log_messages()
            .contains(&(LogKind::Success, "Custom Strategy started".to_string())));
        console.shutdown().await;
    }

    #[tokio::test]
    async fn test_dispatch_runs_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let api = ready_api();
        let console = Console::new(
            &config(&dir),
            api.clone(),
            Arc::new(MockTransport::idle()),
            Arc::new(RecordingPort::default()),
        )
        .unwrap();
        console.initialize().await;

        console.dispatch(Action::SetField {
            field: "stake".into(),
            value: "2".into(),
        });
        console.dispatch(Action::Refresh);
        console.shutdown().await;

        assert_eq!(console.bot.form().values().initial_stake, 2.0);
        assert_eq!(api.calls("stats"), 2);
    }

    #[tokio::test]
    async fn test_start_during_startup_waits_for_reconciliation() {
        let dir = tempfile::tempdir().unwrap();
        let api = ready_api();
        api.set_status(BotStatus::running_since(chrono::Utc::now().timestamp() - 60));
        api.set_latency(Duration::from_millis(50));
        let console = Console::new(
            &config(&dir),
            api.clone(),
            Arc::new(MockTransport::idle()),
            Arc::new(RecordingPort::default()),
        )
        .unwrap();

        console.spawn_initialize();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!console.is_ready());

        let result = console.execute(Action::Start).await;
        assert!(matches!(result, Err(AppError::ControlDisabled(_))), "Got: {:?}", result);
        assert!(console.is_ready());
        assert_eq!(console.bot.state(), BotState::Running);
        assert_eq!(api.calls("start_bot"), 0);
        console.shutdown().await;
    }

    #[tokio::test]
    async fn test_setup_gate_holds_during_startup() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(MockApi::default());
        api.set_latency(Duration::from_millis(50));
        let console = Console::new(
            &config(&dir),
            api.clone(),
            Arc::new(MockTransport::idle()),
            Arc::new(RecordingPort::default()),
        )
        .unwrap();

        console.spawn_initialize();
        tokio::time::sleep(Duration::from_millis(5)).await;
        console.execute(Action::ClearLog).await.unwrap();
        assert!(!console.is_ready());

        let result = console.execute(Action::Start).await;
        assert!(matches!(result, Err(AppError::Validation(_))), "Got: {:?}", result);
        assert!(console.settings.setup_required());
        assert_eq!(api.calls("start_bot"), 0);
        console.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_releases_waiting_actions() {
        let dir = tempfile::tempdir().unwrap();
        let api = ready_api();
        let console = Console::new(
            &config(&dir),
            api.clone(),
            Arc::new(MockTransport::idle()),
            Arc::new(RecordingPort::default()),
        )
        .unwrap();

        let waiting = tokio::spawn({
            let console = console.clone();
            async move { console.execute(Action::Refresh).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        console.shutdown().await;

        let result = waiting.await.unwrap();
        assert!(matches!(result, Err(AppError::ControlDisabled(_))), "Got: {:?}", result);
        assert_eq!(api.calls("stats"), 0);
    }

    #[test]
    fn test_bad_origin_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(&dir);
        cfg.server_url = "ftp://nowhere".into();
        let result = Console::new(
            &cfg,
            Arc::new(MockApi::default()),
            Arc::new(MockTransport::idle()),
            Arc::new(RecordingPort::default()),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
