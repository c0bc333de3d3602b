//! Server settings, first-run setup gating and local UI preferences

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::controls::{Control, ControlSet};
use super::log_console::LogConsole;
use super::render::RenderPort;
use super::telemetry::TelemetryAggregator;
use crate::api::{DEFAULT_AI_MODEL, DEFAULT_MONGO_URI};
use crate::api::{ConsoleApi, Settings};
use crate::config::SanitizedValue;
use crate::error::{AppError, Result};

// ============================================================================
// Local preferences
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Persisted preferences; keys are `guide_seen` and `theme`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Preferences {
    #[serde(default)]
    pub guide_seen: bool,
    #[serde(default)]
    pub theme: Theme,
}

/// JSON preference file surviving across sessions
pub struct PreferenceStore {
    path: PathBuf,
    prefs: Mutex<Preferences>,
}

impl PreferenceStore {
    /// Load from `path`; a missing or unreadable file yields defaults
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt preferences file, using defaults");
                Preferences::default()
            }),
            Err(_) => Preferences::default(),
        };
        Self {
            path,
            prefs: Mutex::new(prefs),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Preferences> {
        self.prefs.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self) -> Preferences {
        *self.lock()
    }

    /// Apply `change` and persist
    pub fn update(&self, change: impl FnOnce(&mut Preferences)) -> Result<Preferences> {
        let mut prefs = self.lock();
        change(&mut prefs);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&*prefs)?)?;
        Ok(*prefs)
    }
}

// ============================================================================
// Settings manager
// ============================================================================

/// Outcome of the load-time setup check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    /// Credential missing: setup prompt blocks the console
    Required,
    /// Credential present, onboarding guide not seen yet
    ShowGuide,
    Ready,
}

#[derive(Default)]
struct SettingsState {
    settings: Settings,
    setup_required: bool,
    guide_visible: bool,
}

#[derive(Clone)]
pub struct SettingsManager {
    api: Arc<dyn ConsoleApi>,
    log: LogConsole,
    controls: ControlSet,
    port: Arc<dyn RenderPort>,
    prefs: Arc<PreferenceStore>,
    telemetry: TelemetryAggregator,
    inner: Arc<Mutex<SettingsState>>,
}

impl SettingsManager {
    pub fn new(
        api: Arc<dyn ConsoleApi>,
        log: LogConsole,
        controls: ControlSet,
        port: Arc<dyn RenderPort>,
        prefs: Arc<PreferenceStore>,
        telemetry: TelemetryAggregator,
    ) -> Self {
        port.theme_changed(prefs.get().theme);
        Self {
            api,
            log,
            controls,
            port,
            prefs,
            telemetry,
            inner: Arc::new(Mutex::new(SettingsState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SettingsState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    pub fn setup_required(&self) -> bool {
        self.lock().setup_required
    }

    pub fn guide_visible(&self) -> bool {
        self.lock().guide_visible
    }

    pub fn theme(&self) -> Theme {
        self.prefs.get().theme
    }

    /// Fetch settings and decide between setup prompt, guide, or nothing
    pub async fn check_setup(&self) -> Result<SetupState> {
        let settings = match self.api.settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Settings fetch failed");
                return Err(e);
            }
        };
        info!(
            token = %SanitizedValue::new(&settings.api_token),
            mongo_uri = %settings.mongo_uri,
            "Settings loaded"
        );
        let guide_seen = self.prefs.get().guide_seen;

        let mut inner = self.lock();
        inner.settings = settings;
        self.port.settings_changed(&inner.settings);

        if !inner.settings.has_credentials() {
            inner.setup_required = true;
            self.port.setup_changed(true);
            return Ok(SetupState::Required);
        }
        if inner.setup_required {
            inner.setup_required = false;
            self.port.setup_changed(false);
        }
        if !guide_seen {
            inner.guide_visible = true;
            self.port.guide_changed(true);
            return Ok(SetupState::ShowGuide);
        }
        Ok(SetupState::Ready)
    }

    /// Persist first-run credentials, unblock the console and pull telemetry
    pub async fn complete_setup(&self, api_token: &str, mongo_uri: &str) -> Result<()> {
        let _guard = self.controls.acquire(Control::SaveSetup)?;
        let api_token = api_token.trim();
        if api_token.is_empty() {
            let err = AppError::Validation("API token is required".into());
            self.log.error(err.to_string());
            return Err(err);
        }

        let mut settings = self.settings();
        settings.api_token = api_token.to_string();
        settings.mongo_uri = match mongo_uri.trim() {
            "" => DEFAULT_MONGO_URI.to_string(),
            uri => uri.to_string(),
        };

        if let Err(e) = self.api.save_settings(&settings).await {
            self.log.error(format!("Failed to save settings: {}", e));
            return Err(e);
        }

        let show_guide = !self.prefs.get().guide_seen;
        {
            let mut inner = self.lock();
            inner.settings = settings;
            inner.setup_required = false;
            inner.guide_visible = show_guide;
            self.port.settings_changed(&inner.settings);
            self.port.setup_changed(false);
            if show_guide {
                self.port.guide_changed(true);
            }
        }
        info!("Initial setup completed");
        self.log.success("Initial setup completed.");
        self.telemetry.refresh_all().await;
        Ok(())
    }

    /// Persist edited settings and ask for a full console reload
    pub async fn save(&self, settings: Settings) -> Result<()> {
        let _guard = self.controls.acquire(Control::SaveSettings)?;
        let mut settings = settings;
        if settings.mongo_uri.trim().is_empty() {
            settings.mongo_uri = DEFAULT_MONGO_URI.to_string();
        }
        if !settings.openai_key.is_empty() && settings.openai_model.is_empty() {
            settings.openai_model = DEFAULT_AI_MODEL.to_string();
        }

        if let Err(e) = self.api.save_settings(&settings).await {
            self.log.error(format!("Failed to save settings: {}", e));
            return Err(e);
        }
        {
            let mut inner = self.lock();
            inner.settings = settings;
            self.port.settings_changed(&inner.settings);
        }
        self.log.success("Settings saved.");
        self.port.reload_requested();
        Ok(())
    }

    /// Apply one `key value` edit on top of the current settings, then save
    pub async fn save_field(&self, key: &str, value: &str) -> Result<()> {
        let mut settings = self.settings();
        let value = value.trim().to_string();
        match key {
            "token" => settings.api_token = value,
            "mongo" => settings.mongo_uri = value,
            "ai_key" => settings.openai_key = value,
            "ai_model" => settings.openai_model = value,
            other => {
                return Err(AppError::Validation(format!(
                    "unknown setting '{}' (expected token, mongo, ai_key, ai_model)",
                    other
                )))
            }
        }
        self.save(settings).await
    }

    pub fn show_guide(&self) {
        self.lock().guide_visible = true;
        self.port.guide_changed(true);
    }

    /// Hide the guide and remember it was seen on this machine
    pub fn dismiss_guide(&self) {
        self.lock().guide_visible = false;
        self.port.guide_changed(false);
        if let Err(e) = self.prefs.update(|p| p.guide_seen = true) {
            warn!(path = %self.prefs.path().display(), error = %e, "Could not persist guide flag");
        }
    }

    pub fn toggle_theme(&self) -> Theme {
        let next = self.theme().toggled();
        if let Err(e) = self.prefs.update(|p| p.theme = next) {
            warn!(path = %self.prefs.path().display(), error = %e, "Could not persist theme");
        }
        self.port.theme_changed(next);
        next
    }
}
