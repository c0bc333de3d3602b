//! End-to-end console tests
//!
//! Drives a full console against a mockito bot server and a scripted
//! telemetry channel:
//! 1. Initialization: channel, full telemetry pull, status reconciliation
//! 2. Channel frames into the operator log
//! 3. Stop / failed start round trips
//!
//! # Running the tests
//! ```bash
//! cargo test --test console_flow
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use mockito::{Matcher, Server, ServerGuard};

use bot_console::api::ApiClient;
use bot_console::config::ConsoleConfig;
use bot_console::core::{
    Action, BotState, BotView, Console, ConnectionState, FrameStream, LogEntry, LogKind,
    PanelState, RenderPort, TelemetryTransport, BLANK_RUNTIME,
};
use bot_console::error::Result;

// =============================================================================
// Test doubles
// =============================================================================

/// Channel that delivers a fixed script of frames, then stays open
struct ScriptedChannel {
    frames: Vec<String>,
}

#[async_trait]
impl TelemetryTransport for ScriptedChannel {
    async fn open(&self, _url: &str) -> Result<FrameStream> {
        let frames: Vec<Result<String>> = self.frames.iter().cloned().map(Ok).collect();
        Ok(stream::iter(frames).chain(stream::pending()).boxed())
    }
}

#[derive(Default)]
struct Screen {
    log: Mutex<Vec<LogEntry>>,
    bot: Mutex<Option<BotView>>,
    runtime: Mutex<String>,
    connection: Mutex<Option<ConnectionState>>,
}

impl Screen {
    fn messages(&self) -> Vec<(LogKind, String)> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.kind, e.message.clone()))
            .collect()
    }

    fn has(&self, kind: LogKind, message: &str) -> bool {
        self.messages()
            .iter()
            .any(|(k, m)| *k == kind && m == message)
    }
}

impl RenderPort for Screen {
    fn connection_changed(&self, state: ConnectionState) {
        *self.connection.lock().unwrap() = Some(state);
    }

    fn bot_changed(&self, view: &BotView) {
        *self.bot.lock().unwrap() = Some(*view);
    }

    fn runtime_tick(&self, runtime: &str) {
        *self.runtime.lock().unwrap() = runtime.to_string();
    }

    fn log_appended(&self, entry: &LogEntry, evicted: usize) {
        let mut log = self.log.lock().unwrap();
        let evicted = evicted.min(log.len());
        log.drain(..evicted);
        log.push(entry.clone());
    }
}

// =============================================================================
// Fixtures
// =============================================================================

const TRADES: &str = r#"[
    {"timestamp":"2024-05-01T10:00:03Z","strategy":"rise_fall","contract_type":"PUT","stake":1.0,"profit":-1.0,"total_pnl":0.95},
    {"timestamp":"2024-05-01T10:00:01Z","strategy":"rise_fall","contract_type":"CALL","stake":1.0,"profit":0.95,"total_pnl":0.95},
    {"timestamp":"2024-05-01T10:00:02Z","strategy":"rise_fall","contract_type":"CALL","stake":1.0,"profit":0.0,"total_pnl":0.95}
]"#;

async fn bot_server(running: bool) -> ServerGuard {
    let mut server = Server::new_async().await;
    let status = if running {
        r#"{"running":true,"start_time":1714557600}"#
    } else {
        r#"{"running":false}"#
    };

    server
        .mock("GET", "/api/settings")
        .with_body(r#"{"deriv_api_token":"abcd1234efgh","mongo_uri":"mongodb://localhost:27017"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/stats")
        .match_query(Matcher::Any)
        .with_body(r#"{"total_trades":3,"winning_trades":2,"losing_trades":1,"total_pnl":-0.05}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/trades")
        .match_query(Matcher::Any)
        .with_body(TRADES)
        .create_async()
        .await;
    server
        .mock("GET", "/api/sessions")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("sessions collection unavailable")
        .create_async()
        .await;
    server
        .mock("GET", "/api/bot/status")
        .with_body(status)
        .create_async()
        .await;
    server
        .mock("GET", "/api/strategies/list")
        .with_body(r#"[{"name":"scalper.js","tags":["fast"]}]"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/journal/list")
        .match_query(Matcher::Any)
        .with_body("null")
        .create_async()
        .await;
    server
}

fn console_for(server: &ServerGuard, prefs: &tempfile::TempDir, screen: Arc<Screen>) -> Console {
    let config = ConsoleConfig {
        server_url: server.url(),
        refresh_interval_secs: 3600,
        preferences_path: Some(prefs.path().join("preferences.json")),
        ..Default::default()
    };
    let api = Arc::new(ApiClient::new(&config.server_url, Duration::from_secs(5)).unwrap());
    let channel = Arc::new(ScriptedChannel {
        frames: vec![
            r#"{"type":"log","message":"Tick received: 1234.56"}"#.into(),
            r#"{"type":"heartbeat","message":"ignored"}"#.into(),
            "{not json".into(),
            r#"{"type":"error","message":"Contract rejected"}"#.into(),
        ],
    });
    Console::new(&config, api, channel, screen).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_initialize_reconciles_running_bot_without_start() {
    let mut server = bot_server(true).await;
    let start = server
        .mock("POST", "/api/bot/start")
        .expect(0)
        .create_async()
        .await;
    let prefs = tempfile::tempdir().unwrap();
    let screen = Arc::new(Screen::default());
    let console = console_for(&server, &prefs, screen.clone());

    console.initialize().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(console.bot.state(), BotState::Running);
    assert_eq!(console.bot.started_at(), Some(1714557600));
    let view = screen.bot.lock().unwrap().unwrap();
    assert!(!view.start_enabled && view.stop_enabled && view.inputs_locked, "Got: {:?}", view);
    assert!(screen.has(LogKind::System, "Synced bot status: Running"));
    start.assert_async().await;

    console.shutdown().await;
}

#[tokio::test]
async fn test_telemetry_panels_apply_independently() {
    let server = bot_server(false).await;
    let prefs = tempfile::tempdir().unwrap();
    let screen = Arc::new(Screen::default());
    let console = console_for(&server, &prefs, screen);

    console.initialize().await;
    let snapshot = console.telemetry.snapshot();

    assert_eq!(
        snapshot.sessions,
        PanelState::Failed("sessions collection unavailable".into())
    );
    let stats = snapshot.stats.loaded().expect("stats loaded");
    assert!((stats.win_rate - 66.666).abs() < 0.01, "Got: {}", stats.win_rate);

    let trades = snapshot.trades.loaded().expect("trades loaded");
    let order: Vec<&str> = trades.iter().map(|t| t.contract_type.as_str()).collect();
    assert_eq!(order, vec!["CALL", "CALL", "PUT"]);

    let charts = snapshot.charts.loaded().expect("charts loaded");
    assert_eq!((charts.wins, charts.losses), (2, 1));
    assert_eq!(charts.profit_bars.last().unwrap().label, "#3");
    assert!(!charts.profit_bars.last().unwrap().positive);
    assert!(console.journal.entries().loaded().unwrap().is_empty());

    console.shutdown().await;
}

#[tokio::test]
async fn test_channel_frames_reach_operator_log() {
    let server = bot_server(false).await;
    let prefs = tempfile::tempdir().unwrap();
    let screen = Arc::new(Screen::default());
    let console = console_for(&server, &prefs, screen.clone());

    console.initialize().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*screen.connection.lock().unwrap(), Some(ConnectionState::Connected));
    assert!(screen.has(LogKind::System, "Connected to server"));
    assert!(screen.has(LogKind::Log, "Tick received: 1234.56"));
    assert!(screen.has(LogKind::Error, "Contract rejected"));
    let messages = screen.messages();
    assert!(
        !messages.iter().any(|(_, m)| m == "ignored" || m.contains("not json")),
        "Got: {:?}",
        messages
    );

    console.shutdown().await;
}

#[tokio::test]
async fn test_stop_then_rejected_start() {
    let mut server = bot_server(true).await;
    server
        .mock("POST", "/api/bot/stop")
        .with_body(r#"{"status":"stopped"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/bot/start")
        .with_status(400)
        .with_body("stake too low")
        .create_async()
        .await;
    let prefs = tempfile::tempdir().unwrap();
    let screen = Arc::new(Screen::default());
    let console = console_for(&server, &prefs, screen.clone());
    console.initialize().await;

    console.execute(Action::Stop).await.unwrap();
    assert_eq!(console.bot.state(), BotState::Stopped);
    assert_eq!(*screen.runtime.lock().unwrap(), BLANK_RUNTIME);
    assert!(screen.has(LogKind::System, "Bot stopped"));

    let err = console.execute(Action::Start).await.unwrap_err();
    assert_eq!(err.to_string(), "stake too low");
    assert_eq!(console.bot.state(), BotState::Stopped);
    let view = screen.bot.lock().unwrap().unwrap();
    assert!(view.start_enabled && !view.stop_enabled, "Got: {:?}", view);
    assert!(screen.has(LogKind::Error, "Failed to start bot: stake too low"));

    console.shutdown().await;
}
