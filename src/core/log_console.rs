//! Operator log: bounded, append-only, FIFO eviction
//!
//! Entries are immutable after insertion and rendered in `append` order. The
//! port is notified while the buffer lock is held so concurrent appends can
//! never reach the display out of order.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::Local;

use super::render::RenderPort;
use crate::api::ChannelMessage;

/// Default number of entries kept
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Entry styling; never drives control flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Log,
    Info,
    Error,
    Success,
    System,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogKind::Log => "log",
            LogKind::Info => "info",
            LogKind::Error => "error",
            LogKind::Success => "success",
            LogKind::System => "system",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Local wall clock, `HH:MM:SS`
    pub time: String,
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    pub fn now(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            time: Local::now().format("%H:%M:%S").to_string(),
            kind,
            message: message.into(),
        }
    }
}

/// Channel frames that belong in the operator log; everything else is ignored
pub fn forwardable(message: ChannelMessage) -> Option<(LogKind, String)> {
    match message {
        ChannelMessage::Log { message } => Some((LogKind::Log, message)),
        ChannelMessage::Info { message } => Some((LogKind::Info, message)),
        ChannelMessage::Error { message } => Some((LogKind::Error, message)),
        ChannelMessage::Other => None,
    }
}

/// Fixed-capacity ring of log entries
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push, evicting from the front; returns how many entries were evicted
    pub fn push(&mut self, entry: LogEntry) -> usize {
        self.entries.push_back(entry);
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

/// Shared handle to the operator log
#[derive(Clone)]
pub struct LogConsole {
    buffer: Arc<Mutex<LogBuffer>>,
    port: Arc<dyn RenderPort>,
}

impl LogConsole {
    pub fn new(capacity: usize, port: Arc<dyn RenderPort>) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(LogBuffer::new(capacity))),
            port,
        }
    }

    pub fn append(&self, message: impl Into<String>, kind: LogKind) -> LogEntry {
        let entry = LogEntry::now(kind, message);
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        let evicted = buffer.push(entry.clone());
        self.port.log_appended(&entry, evicted);
        entry
    }

    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.append(message, LogKind::Info)
    }

    pub fn success(&self, message: impl Into<String>) -> LogEntry {
        self.append(message, LogKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> LogEntry {
        self.append(message, LogKind::Error)
    }

    pub fn system(&self, message: impl Into<String>) -> LogEntry {
        self.append(message, LogKind::System)
    }

    /// Empty the log, leaving a single entry recording the clear
    pub fn clear(&self) {
        let entry = LogEntry::now(LogKind::System, "Logs cleared");
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.clear();
        self.port.log_cleared();
        buffer.push(entry.clone());
        self.port.log_appended(&entry, 0);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        let buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
