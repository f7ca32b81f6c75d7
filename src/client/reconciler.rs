//! Per-participant de-duplication between local edits and relay events.
//!
//! The reconciler remembers the last document this participant either sent
//! or applied. Anything equal to it is neither sent again nor written back
//! into the editor, which is what suppresses echoes and no-op traffic.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::client::editor::Editor;
use crate::client::gate::EditorReady;
use crate::client::status::StatusLog;
use crate::error::{ClientError, EditorError};
use crate::protocol::Event;
use crate::types::Document;

/// What a send request ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The document was handed to the transport
    Sent(Document),
    /// Editor content equals the last known value
    Unchanged,
    /// Editor content was blank
    NothingToSend,
}

/// What an inbound document ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Written into the editor
    Applied,
    /// Editor not ready; held as the pending update
    Queued,
    /// Equal to the last known value, or an empty snapshot
    Ignored,
    /// Blank document refused by the write path
    Rejected,
    /// The editor refused the write
    Failed(EditorError),
}

/// Reconciler state for one participant session
pub struct Reconciler {
    last_known: Document,
    pending: Option<Document>,
    editor: Option<Arc<dyn Editor>>,
    outbound: mpsc::UnboundedSender<Event>,
    status: StatusLog,
}

impl Reconciler {
    /// Creates a reconciler that emits outbound events on `outbound`
    pub fn new(outbound: mpsc::UnboundedSender<Event>) -> Self {
        Reconciler {
            last_known: Document::empty(),
            pending: None,
            editor: None,
            outbound,
            status: StatusLog::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.editor.is_some()
    }

    pub fn last_known(&self) -> &Document {
        &self.last_known
    }

    pub fn pending(&self) -> Option<&Document> {
        self.pending.as_ref()
    }

    pub fn status(&self) -> &StatusLog {
        &self.status
    }

    /// Reads the editor and transmits its document if it changed.
    pub async fn send(&mut self) -> Result<SendOutcome, ClientError> {
        let Some(editor) = self.editor.clone() else {
            self.status.push("Editor not ready. Cannot send structure.");
            return Err(ClientError::EditorUnavailable);
        };

        let current = match editor.get_document().await {
            Ok(document) => document,
            Err(e) => {
                self.status
                    .push(format!("Error getting structure from editor: {e}"));
                return Err(e.into());
            }
        };

        if current == self.last_known {
            self.status.push("Structure unchanged, not sending.");
            return Ok(SendOutcome::Unchanged);
        }
        if current.is_blank() {
            self.status.push("No structure to send.");
            return Ok(SendOutcome::NothingToSend);
        }

        self.status.push("Sending structure update...");
        self.outbound
            .send(Event::DrawingUpdate(current.clone()))
            .map_err(|_| ClientError::Disconnected)?;
        self.last_known = current.clone();
        Ok(SendOutcome::Sent(current))
    }

    /// Handles the snapshot the relay sends right after connecting
    pub async fn on_initial_structure(&mut self, document: Document) -> ApplyOutcome {
        self.status.push("Received initial structure from server.");
        if document.is_empty() || document == self.last_known {
            return ApplyOutcome::Ignored;
        }
        self.apply(document).await
    }

    /// Handles an update forwarded from another participant
    pub async fn on_drawing_update(&mut self, document: Document) -> ApplyOutcome {
        if document == self.last_known {
            self.status
                .push("Received own update back (echo) or identical structure. Not updating.");
            return ApplyOutcome::Ignored;
        }
        self.status.push("Received real-time update from another user.");
        self.apply(document).await
    }

    /// Adopts the editor found by the session gate and flushes the pending
    /// update, if any.
    pub async fn on_editor_ready(&mut self, ready: EditorReady) -> Option<ApplyOutcome> {
        self.status.push(format!(
            "Editor API found after {}ms.",
            ready.waited.as_millis()
        ));
        self.editor = Some(ready.editor.clone());

        let pending = self.pending.take()?;
        self.status
            .push("Applying queued structure now that the editor is ready.");
        let outcome = self.write_to_editor(&ready.editor, &pending).await;
        if outcome != ApplyOutcome::Applied {
            // The queued value never reached the editor, so it is not known
            self.last_known = Document::empty();
        }
        Some(outcome)
    }

    /// Records that the gate gave up; the editor stays unusable
    pub fn on_editor_failed(&mut self, error: &ClientError) {
        self.status.push(format!("Error: {error}."));
    }

    /// A fresh connection always starts from the relay's snapshot
    pub fn on_connected(&mut self) {
        self.last_known = Document::empty();
        self.status.push("Connected to server.");
    }

    pub fn on_disconnected(&mut self) {
        self.status.push("Disconnected from server.");
    }

    pub fn on_connect_error(&mut self, error: &ClientError) {
        self.status.push(format!("Connection error: {error}"));
    }

    async fn apply(&mut self, document: Document) -> ApplyOutcome {
        let Some(editor) = self.editor.clone() else {
            if document.is_blank() {
                return self.reject_blank();
            }
            self.status.push(
                "Editor not ready yet for setting structure. Structure will be set when editor is ready.",
            );
            self.pending = Some(document.clone());
            self.last_known = document;
            return ApplyOutcome::Queued;
        };

        let outcome = self.write_to_editor(&editor, &document).await;
        if outcome == ApplyOutcome::Applied {
            self.last_known = document;
        }
        outcome
    }

    /// The only path that writes into the editor. Network input is not
    /// trusted, so blank documents are refused here as well.
    async fn write_to_editor(
        &mut self,
        editor: &Arc<dyn Editor>,
        document: &Document,
    ) -> ApplyOutcome {
        if document.is_blank() {
            return self.reject_blank();
        }
        match editor.set_document(document).await {
            Ok(()) => {
                self.status
                    .push("Editor canvas updated with received structure.");
                ApplyOutcome::Applied
            }
            Err(e) => {
                warn!("Editor rejected structure: {}", e);
                self.status
                    .push(format!("Error setting structure in editor: {e}"));
                ApplyOutcome::Failed(e)
            }
        }
    }

    fn reject_blank(&mut self) -> ApplyOutcome {
        self.status
            .push("Warning: Attempted to set empty or whitespace structure.");
        ApplyOutcome::Rejected
    }
}
