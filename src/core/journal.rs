//! Trading journal: list, create and delete entries

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::controls::{Control, ControlSet};
use super::log_console::LogConsole;
use super::render::{PanelState, RenderPort};
use crate::api::{ConsoleApi, JournalEntry};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct JournalManager {
    api: Arc<dyn ConsoleApi>,
    log: LogConsole,
    controls: ControlSet,
    port: Arc<dyn RenderPort>,
    limit: usize,
    entries: Arc<Mutex<PanelState<Vec<JournalEntry>>>>,
}

impl JournalManager {
    pub fn new(
        api: Arc<dyn ConsoleApi>,
        log: LogConsole,
        controls: ControlSet,
        port: Arc<dyn RenderPort>,
        limit: usize,
    ) -> Self {
        Self {
            api,
            log,
            controls,
            port,
            limit,
            entries: Arc::new(Mutex::new(PanelState::Loading)),
        }
    }

    pub fn entries(&self) -> PanelState<Vec<JournalEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub async fn list(&self) -> Result<Vec<JournalEntry>> {
        let result = self.api.list_journal(self.limit).await;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match result {
            Ok(list) => {
                *entries = PanelState::Loaded(list.clone());
                self.port.journal_changed(&entries);
                Ok(list)
            }
            Err(e) => {
                warn!(error = %e, "Journal list failed");
                *entries = PanelState::Failed(e.to_string());
                self.port.journal_changed(&entries);
                Err(e)
            }
        }
    }

    pub async fn create(&self, title: &str, content: &str, tags: &[String]) -> Result<()> {
        let _guard = self.controls.acquire(Control::SaveJournal)?;
        if title.trim().is_empty() || content.trim().is_empty() {
            let err = AppError::Validation("journal entries need a title and content".into());
            self.log.error(err.to_string());
            return Err(err);
        }
        if let Err(e) = self.api.create_journal(title.trim(), content, tags).await {
            self.log.error(format!("Failed to save journal entry: {}", e));
            return Err(e);
        }
        info!(title = %title.trim(), "Journal entry saved");
        self.log.success("Journal entry saved");
        let _ = self.list().await;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.controls.acquire(Control::DeleteJournal)?;
        if let Err(e) = self.api.delete_journal(id).await {
            self.log.error(format!("Failed to delete journal entry: {}", e));
            return Err(e);
        }
        info!(id = %id, "Journal entry deleted");
        self.log.system("Journal entry deleted");
        let _ = self.list().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{MockApi, RecordingPort};

    fn journal(api: Arc<MockApi>) -> JournalManager {
        let port = Arc::new(RecordingPort::default());
        let log = LogConsole::new(500, port.clone());
        let controls = ControlSet::new(port.clone());
        JournalManager::new(api, log, controls, port, 50)
    }

    #[tokio::test]
    async fn test_create_refetches_list() {
        let api = Arc::new(MockApi::default());
        let journal = journal(api.clone());

        journal
            .create("Overtraded", "Too many entries after 3 losses", &["discipline".into()])
            .await
            .unwrap();
        let entries = journal.entries();
        let list = entries.loaded().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Overtraded");
        assert_eq!(list[0].tags, vec!["discipline".to_string()]);
        assert_eq!(api.calls("list_journal"), 1);
        assert_eq!(api.last_limit("list_journal"), Some(50));
    }

    #[tokio::test]
    async fn test_create_requires_title_and_content() {
        let api = Arc::new(MockApi::default());
        let journal = journal(api.clone());
        assert!(journal.create("", "body", &[]).await.is_err());
        assert!(journal.create("title", "  ", &[]).await.is_err());
        assert_eq!(api.calls("create_journal"), 0);
        assert!(journal.controls.is_enabled(Control::SaveJournal));
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let api = Arc::new(MockApi::default());
        let journal = journal(api.clone());
        journal.create("a", "b", &[]).await.unwrap();
        let id = journal.entries().loaded().unwrap()[0].id.clone();

        journal.delete(&id).await.unwrap();
        assert!(journal.entries().loaded().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_is_panel_scoped() {
        let api = Arc::new(MockApi::default());
        api.reject("list_journal", 503, "journal offline");
        let journal = journal(api);
        assert!(journal.list().await.is_err());
        assert_eq!(journal.entries(), PanelState::Failed("journal offline".into()));
    }
}
