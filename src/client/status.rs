//! Bounded, human-readable status log shown to a participant.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::info;

/// Number of messages retained by default
pub const DEFAULT_STATUS_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Most-recent-first log capped at a fixed length.
///
/// Purely informational. Every entry is also forwarded to `tracing`.
#[derive(Debug, Clone)]
pub struct StatusLog {
    entries: VecDeque<StatusEntry>,
    capacity: usize,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_STATUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        StatusLog {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a message, evicting the oldest once full
    pub fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "molsync::status", "{}", message);

        self.entries.push_front(StatusEntry {
            at: Utc::now(),
            message,
        });
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.front().map(|e| e.message.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new()
    }
}
