//! Bounded log console of the simulated host.

use std::collections::VecDeque;

use strum::{Display, EnumString};

use crate::codec::{Map, Value};

/// Entries kept before the oldest are discarded.
pub const CONSOLE_CAPACITY: usize = 1000;

/// Severity of a console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogKind {
    /// Informational message.
    Log,
    /// Recoverable problem.
    Warning,
    /// Failure reported by host code.
    Error,
    /// Uncaught exception.
    Exception,
}

/// One captured console line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Severity.
    pub kind: LogKind,
    /// Text as logged.
    pub message: String,
    /// Seconds since the host started.
    pub time: f64,
}

impl LogEntry {
    fn to_value(&self) -> Value {
        Value::from(
            Map::new()
                .with("type", self.kind.to_string())
                .with("message", self.message.as_str())
                .with("time", self.time),
        )
    }
}

/// Ring buffer of recent console entries.
#[derive(Debug)]
pub struct Console {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for Console {
    fn default() -> Self {
        Self::with_capacity(CONSOLE_CAPACITY)
    }
}

impl Console {
    /// Console keeping at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(CONSOLE_CAPACITY)),
            capacity,
        }
    }

    /// Appends an entry, discarding the oldest when full. A zero-capacity
    /// console keeps nothing.
    pub fn push(&mut self, kind: LogKind, message: impl Into<String>, time: f64) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            kind,
            message: message.into(),
            time,
        });
    }

    /// The newest `count` entries matching `kind`, oldest first.
    #[must_use]
    pub fn recent(&self, count: usize, kind: Option<LogKind>) -> Vec<&LogEntry> {
        let mut selected: Vec<&LogEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|entry| kind.is_none_or(|kind| entry.kind == kind))
            .take(count)
            .collect();
        selected.reverse();
        selected
    }

    /// Encodes [`Console::recent`] as a list value.
    #[must_use]
    pub fn recent_value(&self, count: usize, kind: Option<LogKind>) -> Value {
        Value::from(
            self.recent(count, kind)
                .into_iter()
                .map(LogEntry::to_value)
                .collect::<Vec<_>>(),
        )
    }

    /// Discards every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
