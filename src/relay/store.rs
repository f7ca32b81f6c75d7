//! The single authoritative copy of the shared document.

use crate::types::Document;

/// In-memory holder of the canonical document.
///
/// Exactly one store exists per relay and it is only ever touched from the
/// relay task, so it needs no interior locking. The value is overwritten on
/// every accepted update; no history is kept and nothing survives a restart.
#[derive(Debug, Default)]
pub struct DocumentStore {
    current: Document,
}

impl DocumentStore {
    /// Creates a store holding the empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with an existing value
    pub fn with_document(document: Document) -> Self {
        DocumentStore { current: document }
    }

    pub fn read(&self) -> &Document {
        &self.current
    }

    /// Replaces the current document.
    ///
    /// Validation happens in the relay before this is called.
    pub fn write(&mut self, document: Document) {
        self.current = document;
    }
}
