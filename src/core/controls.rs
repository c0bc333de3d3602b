//! Operator controls and the anti-double-submit guard
//!
//! A disabled control is a cooperative lock, not a real one: it stops the
//! operator from firing the same action twice while a call is in flight.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::render::RenderPort;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Start,
    Stop,
    Refresh,
    RunScript,
    SaveStrategy,
    DeleteStrategy,
    SaveSetup,
    SaveSettings,
    SaveJournal,
    DeleteJournal,
    Analyze,
    Generate,
}

impl Control {
    pub const ALL: [Control; 12] = [
        Control::Start,
        Control::Stop,
        Control::Refresh,
        Control::RunScript,
        Control::SaveStrategy,
        Control::DeleteStrategy,
        Control::SaveSetup,
        Control::SaveSettings,
        Control::SaveJournal,
        Control::DeleteJournal,
        Control::Analyze,
        Control::Generate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Control::Start => "Start",
            Control::Stop => "Stop",
            Control::Refresh => "Refresh",
            Control::RunScript => "Run Script",
            Control::SaveStrategy => "Save Strategy",
            Control::DeleteStrategy => "Delete Strategy",
            Control::SaveSetup => "Save Setup",
            Control::SaveSettings => "Save Settings",
            Control::SaveJournal => "Save Journal",
            Control::DeleteJournal => "Delete Journal",
            Control::Analyze => "Analyze",
            Control::Generate => "Generate",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Enabled flags of every control, shared by all components
#[derive(Clone)]
pub struct ControlSet {
    enabled: Arc<Mutex<HashMap<Control, bool>>>,
    port: Arc<dyn RenderPort>,
}

impl ControlSet {
    /// All controls enabled except `Stop` (the bot starts out stopped)
    pub fn new(port: Arc<dyn RenderPort>) -> Self {
        let enabled = Control::ALL
            .iter()
            .map(|c| (*c, *c != Control::Stop))
            .collect();
        Self {
            enabled: Arc::new(Mutex::new(enabled)),
            port,
        }
    }

    pub fn is_enabled(&self, control: Control) -> bool {
        let enabled = self.enabled.lock().unwrap_or_else(|e| e.into_inner());
        enabled.get(&control).copied().unwrap_or(false)
    }

    /// Set a control's flag, notifying the port only on change
    pub fn set(&self, control: Control, value: bool) {
        let mut enabled = self.enabled.lock().unwrap_or_else(|e| e.into_inner());
        let previous = enabled.insert(control, value);
        if previous != Some(value) {
            self.port.control_changed(control, value);
        }
    }

    /// Disable `control` for the lifetime of the returned guard
    ///
    /// Fails with `ControlDisabled` when the control is already disabled.
    pub fn acquire(&self, control: Control) -> Result<ControlGuard> {
        let mut enabled = self.enabled.lock().unwrap_or_else(|e| e.into_inner());
        if !enabled.get(&control).copied().unwrap_or(false) {
            debug!(control = %control, "Control busy, action ignored");
            return Err(AppError::ControlDisabled(control.label().to_string()));
        }
        enabled.insert(control, false);
        self.port.control_changed(control, false);
        Ok(ControlGuard {
            controls: self.clone(),
            control,
        })
    }
}

/// Re-enables its control on drop, whatever the outcome of the action
pub struct ControlGuard {
    controls: ControlSet,
    control: Control,
}

impl ControlGuard {
    pub fn control(&self) -> Control {
        self.control
    }
}

impl Drop for ControlGuard {
    fn drop(&mut self) {
        self.controls.set(self.control, true);
    }
}
