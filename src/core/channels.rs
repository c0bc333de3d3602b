//! Operator actions and the channels carrying them
//!
//! The key handler produces [`Action`]s; the console dispatcher consumes them.
//! Shutdown is broadcast to every background task.

use std::path::PathBuf;

use tokio::sync::{broadcast, mpsc};

/// Default channel capacity for the action queue
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Everything the operator can ask the console to do
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Start,
    Stop,
    Refresh,
    CycleFilter,
    SetFilter(Option<String>),
    ClearLog,
    ToggleTheme,
    SetField { field: String, value: String },

    NewScript,
    LoadStrategy(String),
    SaveStrategy { name: String, tags: Vec<String> },
    DeleteStrategy(String),
    ImportScript(PathBuf),
    ExportScript(PathBuf),
    RunScript,

    CreateJournal { title: String, content: String, tags: Vec<String> },
    DeleteJournal(String),

    LoadAnalytics,
    Analyze(String),
    Generate { prompt: String, mode: String, model: Option<String> },
    ExportTrades(PathBuf),
    DownloadLogs(PathBuf),

    CompleteSetup { token: String, mongo_uri: String },
    SaveSetting { key: String, value: String },
    ShowGuide,
    DismissGuide,
}

impl Action {
    /// Purely local; runs before the first status and settings checks return
    pub fn allowed_while_starting(&self) -> bool {
        matches!(self, Action::ClearLog | Action::ToggleTheme)
    }

    /// Allowed while the first-run setup prompt is blocking the console
    pub fn allowed_during_setup(&self) -> bool {
        matches!(
            self,
            Action::CompleteSetup { .. } | Action::ClearLog | Action::ToggleTheme
        )
    }
}

/// Bundle of the console's inter-task channels
#[derive(Debug)]
pub struct ChannelBundle {
    /// Key handler -> dispatcher
    pub action_tx: mpsc::Sender<Action>,
    pub action_rx: mpsc::Receiver<Action>,

    /// Shutdown broadcast: runtime -> all background tasks
    pub shutdown_tx: broadcast::Sender<()>,
}

impl ChannelBundle {
    pub fn new(capacity: usize) -> Self {
        let (action_tx, action_rx) = mpsc::channel(capacity);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            action_tx,
            action_rx,
            shutdown_tx,
        }
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_actions_flow_in_order() {
        let mut bundle = ChannelBundle::new(8);
        bundle.action_tx.send(Action::Start).await.unwrap();
        bundle.action_tx.send(Action::Stop).await.unwrap();
        assert_eq!(bundle.action_rx.recv().await, Some(Action::Start));
        assert_eq!(bundle.action_rx.recv().await, Some(Action::Stop));
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let bundle = ChannelBundle::default();
        let mut rx = bundle.subscribe_shutdown();

        assert!(bundle.shutdown_tx.send(()).is_ok());
        assert!(rx.recv().await.is_ok());
    }

    #[test]
    fn test_setup_gate() {
        assert!(Action::CompleteSetup {
            token: "t".into(),
            mongo_uri: String::new()
        }
        .allowed_during_setup());
        assert!(!Action::Start.allowed_during_setup());
        assert!(!Action::SaveSetting {
            key: "token".into(),
            value: "x".into()
        }
        .allowed_during_setup());
    }

    #[test]
    fn test_only_local_actions_skip_startup() {
        assert!(Action::ClearLog.allowed_while_starting());
        assert!(Action::ToggleTheme.allowed_while_starting());
        assert!(!Action::Start.allowed_while_starting());
        assert!(!Action::CompleteSetup {
            token: "t".into(),
            mongo_uri: String::new()
        }
        .allowed_while_starting());
    }
}
