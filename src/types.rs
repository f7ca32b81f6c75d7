//! Fundamental type definitions for structure synchronization.
//!
//! This module contains the core value types shared by the relay and the
//! participant side: the shared document and the session identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of characters kept when a document is rendered for a log line.
pub const PREVIEW_CHARS: usize = 50;

/// The single shared piece of collaboratively edited content.
///
/// A `Document` is an opaque serialized structure (a molfile in practice).
/// Nothing in this crate interprets its contents: two documents are the same
/// if and only if their text is byte-for-byte equal.
///
/// # Design Notes
///
/// The only property ever inspected is whether the text is blank. A blank
/// document is never stored by the relay and never written into an editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(String);

impl Document {
    /// Creates a document from serialized text
    pub fn new(text: impl Into<String>) -> Self {
        Document(text.into())
    }

    /// The empty document every relay starts with
    pub fn empty() -> Self {
        Document(String::new())
    }

    /// Returns true if the document is empty or whitespace-only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a short rendering suitable for log lines.
    ///
    /// Documents longer than [`PREVIEW_CHARS`] characters are cut and
    /// suffixed with `...`.
    pub fn preview(&self) -> String {
        match self.0.char_indices().nth(PREVIEW_CHARS) {
            Some((cut, _)) => format!("{}...", &self.0[..cut]),
            None => self.0.clone(),
        }
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Document(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Document(text.to_string())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one live connection to the relay.
///
/// Sessions carry no identity beyond the connection itself; the id exists
/// only so the relay can exclude the sender when broadcasting and release
/// the session on disconnect. Ids are handed out sequentially by the relay
/// and never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session_{}", self.0)
    }
}
