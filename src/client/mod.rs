//! Participant-side synchronization.
//!
//! This module contains the editor boundary, the readiness gate that finds
//! the editor once it has loaded, the reconciler that suppresses echoes and
//! redundant writes, and the transport loop tying them to the relay.

pub mod connection;
pub mod editor;
pub mod gate;
pub mod reconciler;
pub mod status;

// Re-export the main public API
pub use connection::{ClientCommand, Participant};
pub use editor::{Editor, EditorProbe, EditorSlot, MemoryEditor};
pub use gate::{EditorReady, GateConfig, ReadySignal, SessionGate};
pub use reconciler::{ApplyOutcome, Reconciler, SendOutcome};
pub use status::{StatusEntry, StatusLog};
