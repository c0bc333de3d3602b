//! Custom tracing Layer for the developer pane
//!
//! Captures developer traces and pushes them to `ViewState.dev_logs`. These
//! never enter the operator log.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::app::{DevLogEntry, ViewState};

/// Tracks whether DEBUG traces are captured. Updated from the key handler to
/// avoid acquiring the lock just to check the flag.
static SHOW_DEBUG: AtomicBool = AtomicBool::new(false);

/// Traces dropped due to lock contention; synced into `ViewState` on the next
/// successful capture.
static DROPPED_LOGS: AtomicU64 = AtomicU64::new(0);

pub fn set_show_debug(enabled: bool) {
    SHOW_DEBUG.store(enabled, Ordering::Relaxed);
}

/// Layer that captures traces for the developer pane.
///
/// `on_event()` MUST use `try_lock()`: traces can fire while the draw loop
/// holds the view lock, and `lock()` would deadlock. Dropped traces under
/// contention are acceptable.
pub struct TuiLayer {
    view: Arc<Mutex<ViewState>>,
}

impl TuiLayer {
    pub fn new(view: Arc<Mutex<ViewState>>) -> Self {
        Self { view }
    }
}

impl<S: Subscriber> Layer<S> for TuiLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = event.metadata().level();

        if *level == tracing::Level::DEBUG && !SHOW_DEBUG.load(Ordering::Relaxed) {
            return;
        }

        let mut message = String::new();
        let mut extra_fields = Vec::new();
        let mut visitor = MessageVisitor {
            message: &mut message,
            extra_fields: &mut extra_fields,
        };
        event.record(&mut visitor);

        if !extra_fields.is_empty() {
            message.push_str(" [");
            message.push_str(&extra_fields.join(", "));
            message.push(']');
        }

        let entry = DevLogEntry {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            level: level.to_string(),
            message,
        };

        match self.view.try_lock() {
            Ok(mut view) => {
                let dropped = DROPPED_LOGS.swap(0, Ordering::Relaxed);
                if dropped > 0 {
                    view.dropped_dev_logs += dropped;
                }
                view.push_dev_log(entry);
            }
            Err(_) => {
                DROPPED_LOGS.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Fields worth showing next to the message
const SHOWN_FIELDS: &[&str] = &["error", "url", "status", "strategy", "action", "path"];

struct MessageVisitor<'a> {
    message: &'a mut String,
    extra_fields: &'a mut Vec<String>,
}

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = format!("{:?}", value).trim_matches('"').to_string();
        } else if SHOWN_FIELDS.contains(&field.name()) {
            self.extra_fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else if SHOWN_FIELDS.contains(&field.name()) {
            self.extra_fields.push(format!("{}={}", field.name(), value));
        }
    }
}
