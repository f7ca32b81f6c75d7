//! Boundary to the embedded structure editor.
//!
//! The editor widget itself is external. This crate only needs two things
//! from it, reading the current document and replacing it, plus a way to
//! find out whether its API handle is reachable yet.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::error::EditorError;
use crate::types::Document;

/// Control surface of a loaded editor
#[async_trait]
pub trait Editor: Send + Sync {
    /// Serializes the structure currently drawn in the editor
    async fn get_document(&self) -> Result<Document, EditorError>;

    /// Replaces the drawn structure
    async fn set_document(&self, document: &Document) -> Result<(), EditorError>;
}

/// The well-known place an editor handle appears once loading finishes.
///
/// Probing must be cheap and side-effect free; the session gate calls it on
/// every polling tick.
pub trait EditorProbe: Send + Sync {
    fn locate(&self) -> Option<Arc<dyn Editor>>;
}

impl<F> EditorProbe for F
where
    F: Fn() -> Option<Arc<dyn Editor>> + Send + Sync,
{
    fn locate(&self) -> Option<Arc<dyn Editor>> {
        self()
    }
}

/// A shared slot the embedding host fills once the editor has loaded
#[derive(Clone, Default)]
pub struct EditorSlot {
    handle: Arc<RwLock<Option<Arc<dyn Editor>>>>,
}

impl EditorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the editor handle
    pub fn install(&self, editor: Arc<dyn Editor>) {
        *self.handle.write() = Some(editor);
    }

    pub fn is_installed(&self) -> bool {
        self.handle.read().is_some()
    }
}

impl EditorProbe for EditorSlot {
    fn locate(&self) -> Option<Arc<dyn Editor>> {
        self.handle.read().clone()
    }
}

impl std::fmt::Debug for EditorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSlot")
            .field("installed", &self.is_installed())
            .finish()
    }
}

/// In-process editor holding its document in memory.
///
/// Used by headless participants and by tests. Reads and writes can be made
/// to fail to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryEditor {
    content: Mutex<Document>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Document) -> Self {
        MemoryEditor {
            content: Mutex::new(document),
            ..Self::default()
        }
    }

    /// Simulates a local user edit
    pub fn draw(&self, document: impl Into<Document>) {
        *self.content.lock() = document.into();
    }

    /// Current content without going through the async interface
    pub fn current(&self) -> Document {
        self.content.lock().clone()
    }

    /// Number of successful `set_document` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Editor for MemoryEditor {
    async fn get_document(&self) -> Result<Document, EditorError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(EditorError::Read("editor refused to serialize".to_string()));
        }
        Ok(self.current())
    }

    async fn set_document(&self, document: &Document) -> Result<(), EditorError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EditorError::Write("editor rejected structure".to_string()));
        }
        *self.content.lock() = document.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_editor_read_write() {
        let editor = MemoryEditor::new();
        editor.set_document(&Document::new("M  END")).await.unwrap();

        assert_eq!(editor.get_document().await.unwrap().as_str(), "M  END");
        assert_eq!(editor.write_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_editor_failures() {
        let editor = MemoryEditor::with_document(Document::new("V1"));
        editor.fail_reads(true);
        editor.fail_writes(true);

        assert!(matches!(
            editor.get_document().await,
            Err(EditorError::Read(_))
        ));
        assert!(matches!(
            editor.set_document(&Document::new("V2")).await,
            Err(EditorError::Write(_))
        ));
        assert_eq!(editor.current().as_str(), "V1");
        assert_eq!(editor.write_count(), 0);
    }

    #[test]
    fn test_slot_probe() {
        let slot = EditorSlot::new();
        assert!(slot.locate().is_none());

        slot.install(Arc::new(MemoryEditor::new()));
        assert!(slot.is_installed());
        assert!(slot.locate().is_some());
    }
}
