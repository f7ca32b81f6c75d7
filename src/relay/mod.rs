//! Server-resident synchronization core.
//!
//! This module contains the document store, the relay state machine that
//! fans updates out to sessions, and the task that serializes access to it.

pub mod handle;
pub mod hub;
pub mod store;

// Re-export the main public API
pub use handle::RelayHandle;
pub use hub::{Outbox, Relay, UpdateOutcome};
pub use store::DocumentStore;
