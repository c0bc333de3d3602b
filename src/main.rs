//! Bot Console - Entry Point
//!
//! 1. Load `.env`, configuration and logging
//! 2. Build the console against the bot server
//! 3. `LOG_FORMAT=tui`: run the terminal UI, rebuilding the console when settings change
//!    Otherwise: headless monitor streaming the operator log to stderr until Ctrl+C

use std::sync::{Arc, Mutex};

use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use bot_console::api::ApiClient;
use bot_console::config::constants::{config_path, dev_pane_capacity};
use bot_console::config::{init_logging, load_config, ConsoleConfig, LoggingConfig};
use bot_console::core::{Console, RenderPort, TracingPort, WsTransport};
use bot_console::tui::{self, ExitReason, TuiLayer, TuiPort, ViewState};

fn build_console(config: &ConsoleConfig, port: Arc<dyn RenderPort>) -> anyhow::Result<Console> {
    let api = Arc::new(ApiClient::new(&config.server_url, config.request_timeout())?);
    let console = Console::new(config, api, Arc::new(WsTransport), port)?;
    Ok(console)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let logging = LoggingConfig::from_env();
    let view = Arc::new(Mutex::new(ViewState::new(dev_pane_capacity())));
    let tui_mode = !init_logging(&logging);
    if tui_mode {
        tracing_subscriber::registry()
            .with(logging.env_filter())
            .with(TuiLayer::new(Arc::clone(&view)))
            .try_init()?;
    }

    let path = config_path();
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Configuration failed");
            return Err(e.into());
        }
    };
    info!(server_url = %config.server_url, tui = tui_mode, "Bot console starting");

    if !tui_mode {
        let console = build_console(&config, Arc::new(TracingPort))?;
        console.initialize().await;
        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");
        console.shutdown().await;
        return Ok(());
    }

    loop {
        {
            let mut state = view.lock().unwrap_or_else(|e| e.into_inner());
            let dev_logs = std::mem::take(&mut state.dev_logs);
            *state = ViewState::new(dev_pane_capacity());
            state.dev_logs = dev_logs;
        }
        let port = Arc::new(TuiPort::new(Arc::clone(&view)));
        let console = build_console(&config, port)?;
        console.spawn_initialize();

        let outcome = tui::run(&console, Arc::clone(&view)).await;
        console.shutdown().await;
        match outcome? {
            ExitReason::Quit => break,
            ExitReason::Reload => info!("Settings changed, reloading console"),
        }
    }

    info!("=== Shutdown complete ===");
    Ok(())
}
