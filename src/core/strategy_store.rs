//! Strategy scripts: server-side CRUD plus the local editor buffer
//!
//! The strategy list is a read-through cache, refetched after every mutation.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use super::controls::{Control, ControlSet};
use super::log_console::LogConsole;
use super::render::{PanelState, RenderPort};
use crate::api::{ConsoleApi, Strategy};
use crate::error::{AppError, Result};

/// Editor contents when nothing is loaded
pub const DEFAULT_TEMPLATE: &str = r#"// Custom Strategy Script
// Available globals: log(msg), buy(contractType, amount), onTick(quote)
// config: getInitialStake(), getSymbol()

function onTick(quote) {
    log("Tick: " + quote);

    // Example: buy CALL when the last digit is even
    // if (Math.floor(quote * 100) % 2 === 0) {
    //     buy("CALL", getInitialStake());
    // }
}
"#;

/// Label shown when the editor holds an unsaved script
pub const UNTITLED: &str = "Untitled";

/// Append `.js` unless the name already carries a script extension
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    if name.ends_with(".js") || name.ends_with(".xml") {
        name.to_string()
    } else {
        format!("{}.js", name)
    }
}

/// Split comma-separated tag input, dropping blanks
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorView {
    /// Currently loaded strategy; `None` shows as "Untitled"
    pub current: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
}

impl EditorView {
    pub fn label(&self) -> &str {
        self.current.as_deref().unwrap_or(UNTITLED)
    }
}

impl Default for EditorView {
    fn default() -> Self {
        Self {
            current: None,
            content: DEFAULT_TEMPLATE.to_string(),
            tags: Vec::new(),
        }
    }
}

struct StoreState {
    editor: EditorView,
    list: PanelState<Vec<Strategy>>,
}

#[derive(Clone)]
pub struct StrategyStore {
    api: Arc<dyn ConsoleApi>,
    log: LogConsole,
    controls: ControlSet,
    port: Arc<dyn RenderPort>,
    inner: Arc<Mutex<StoreState>>,
}

impl StrategyStore {
    pub fn new(
        api: Arc<dyn ConsoleApi>,
        log: LogConsole,
        controls: ControlSet,
        port: Arc<dyn RenderPort>,
    ) -> Self {
        Self {
            api,
            log,
            controls,
            port,
            inner: Arc::new(Mutex::new(StoreState {
                editor: EditorView::default(),
                list: PanelState::Loading,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn editor(&self) -> EditorView {
        self.lock().editor.clone()
    }

    pub fn strategies(&self) -> PanelState<Vec<Strategy>> {
        self.lock().list.clone()
    }

    /// Refetch the sidebar list
    pub async fn list(&self) -> Result<Vec<Strategy>> {
        let result = self.api.list_strategies().await;
        let mut inner = self.lock();
        match result {
            Ok(strategies) => {
                inner.list = PanelState::Loaded(strategies.clone());
                self.port.strategies_changed(&inner.list);
                Ok(strategies)
            }
            Err(e) => {
                warn!(error = %e, "Strategy list failed");
                inner.list = PanelState::Failed(e.to_string());
                self.port.strategies_changed(&inner.list);
                Err(e)
            }
        }
    }

    /// Raw script content
    pub async fn get(&self, name: &str) -> Result<String> {
        self.api.get_strategy(name).await
    }

    /// Fetch `name` into the editor and mark it as currently loaded
    pub async fn load(&self, name: &str) -> Result<()> {
        let name = normalize_name(name);
        self.log.info(format!("Loading strategy: {}...", name));
        let content = match self.get(&name).await {
            Ok(content) => content,
            Err(e) => {
                self.log.error(format!("Failed to load strategy: {}", e));
                return Err(e);
            }
        };
        let tags = self
            .strategies()
            .loaded()
            .and_then(|list| list.iter().find(|s| s.name == name).map(|s| s.tags.clone()))
            .unwrap_or_default();
        self.set_editor(EditorView {
            current: Some(name),
            content,
            tags,
        });
        self.log.system("Strategy loaded");
        Ok(())
    }

    /// Upsert a strategy; returns the stored name
    pub async fn save(&self, name: &str, content: &str, tags: &[String]) -> Result<String> {
        let _guard = self.controls.acquire(Control::SaveStrategy)?;
        if name.trim().is_empty() {
            let err = AppError::Validation("strategy name is required".into());
            self.log.error(err.to_string());
            return Err(err);
        }
        let name = normalize_name(name);

        let stored = match self.api.save_strategy(&name, content, tags).await {
            Ok(stored) => stored,
            Err(e) => {
                self.log.error(format!("Failed to save strategy: {}", e));
                return Err(e);
            }
        };
        info!(name = %stored, tags = ?tags, "Strategy saved");
        {
            let mut inner = self.lock();
            inner.editor = EditorView {
                current: Some(stored.clone()),
                content: content.to_string(),
                tags: tags.to_vec(),
            };
            self.port.editor_changed(&inner.editor);
        }
        self.log.success(format!("Strategy saved: {}", stored));
        let _ = self.list().await;
        Ok(stored)
    }

    /// Save the editor buffer under `name`
    pub async fn save_editor(&self, name: &str, tags: &[String]) -> Result<String> {
        let content = self.editor().content;
        self.save(name, &content, tags).await
    }

    /// Remove a strategy; resets the editor if it was the loaded one
    pub async fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.controls.acquire(Control::DeleteStrategy)?;
        let name = normalize_name(name);
        if let Err(e) = self.api.delete_strategy(&name).await {
            self.log.error(format!("Failed to delete strategy: {}", e));
            return Err(e);
        }
        let was_current = {
            let mut inner = self.lock();
            let was_current = inner.editor.current.as_deref() == Some(name.as_str());
            if was_current {
                inner.editor = EditorView::default();
                self.port.editor_changed(&inner.editor);
            }
            was_current
        };
        info!(name = %name, reset_editor = was_current, "Strategy deleted");
        self.log.system(format!("Deleted strategy: {}", name));
        let _ = self.list().await;
        Ok(())
    }

    /// Replace the editor buffer (e.g. generated script)
    pub fn set_editor(&self, editor: EditorView) {
        let mut inner = self.lock();
        inner.editor = editor;
        self.port.editor_changed(&inner.editor);
    }

    /// Back to the built-in template with nothing loaded
    pub fn new_script(&self) {
        self.set_editor(EditorView::default());
    }

    /// Read a local file into the editor as an unsaved script
    pub async fn import_file(&self, path: &Path) -> Result<()> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                self.log.error(format!("Failed to read {}: {}", path.display(), e));
                return Err(e.into());
            }
        };
        self.set_editor(EditorView {
            current: None,
            content,
            tags: Vec::new(),
        });
        self.log.system(format!("Imported {}", path.display()));
        Ok(())
    }

    /// Write the editor buffer to a local file
    pub async fn export_file(&self, path: &Path) -> Result<()> {
        let content = self.editor().content;
        if let Err(e) = tokio::fs::write(path, content).await {
            self.log.error(format!("Failed to write {}: {}", path.display(), e));
            return Err(e.into());
        }
        self.log.success(format!("Strategy exported to {}", path.display()));
        Ok(())
    }
}
