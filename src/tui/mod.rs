//! Terminal UI for the bot console
//!
//! # Keyboard Controls
//! - `s` / `x`: Start / stop the bot
//! - `r`: Refresh telemetry, `f`: cycle strategy filter
//! - `c`: Clear the log, `t`: toggle theme
//! - `l`: Toggle the developer pane (captures DEBUG while open)
//! - `Tab`: Switch view, `↑/k` `↓/j`: scroll the log
//! - `:`: Command line (see [`command`])
//! - `q` or `Ctrl+C`: Quit

pub mod app;
pub mod command;
pub mod event;
pub mod logging;
pub mod ui;

use std::sync::{Arc, Mutex};

use crossterm::event::EventStream;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::config::constants::action_queue_capacity;
use crate::core::{ChannelBundle, Console};
use crate::error::Result;

pub use app::{DevLogEntry, Tab, TuiPort, ViewState};
pub use event::EventResult;
pub use logging::TuiLayer;
pub use ui::Palette;

/// Why the UI loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    /// Settings were saved; rebuild the console and run again
    Reload,
}

/// Run the UI until the operator quits or a reload is requested.
///
/// Keys are turned into actions on this task; a dispatcher task hands them to
/// the console so a slow request never stalls input or redraws.
pub async fn run(console: &Console, view: Arc<Mutex<ViewState>>) -> Result<ExitReason> {
    let channels = ChannelBundle::new(action_queue_capacity());
    let mut shutdown_rx = channels.subscribe_shutdown();
    let ChannelBundle {
        action_tx,
        mut action_rx,
        shutdown_tx,
    } = channels;

    let dispatcher_console = console.clone();
    let dispatcher = tokio::spawn(async move {
        loop {
            tokio::select! {
                action = action_rx.recv() => match action {
                    Some(action) => {
                        debug!(action = ?action, "Dispatching");
                        dispatcher_console.dispatch(action);
                    }
                    None => break,
                },
                _ = shutdown_rx.recv() => break,
            }
        }
    });

    let mut terminal = ratatui::init();
    let mut events = EventStream::new();
    info!("Terminal UI started");

    let result = loop {
        let form = console.bot.form().values().clone();
        {
            let mut state = view.lock().unwrap_or_else(|e| e.into_inner());
            state.form = form;
            if state.reload_requested {
                break Ok(ExitReason::Reload);
            }
            if let Err(e) = terminal.draw(|frame| ui::draw(frame, &state)) {
                break Err(e.into());
            }
        }

        match event::handle_events_async(&view, &mut events).await {
            EventResult::Continue => {}
            EventResult::Quit => break Ok(ExitReason::Quit),
            EventResult::Dispatch(action) => match action_tx.try_send(action) {
                Ok(()) => {}
                Err(TrySendError::Full(action)) => {
                    warn!(action = ?action, "Action queue full, dropping key press");
                }
                Err(TrySendError::Closed(_)) => break Ok(ExitReason::Quit),
            },
        }
    };

    ratatui::restore();
    let _ = shutdown_tx.send(());
    let _ = dispatcher.await;
    info!(reason = ?result.as_ref().ok(), "Terminal UI stopped");
    result
}
