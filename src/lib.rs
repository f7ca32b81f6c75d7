//! # molsync - shared structure editing
//!
//! Lets several participants co-edit one serialized chemical structure and
//! see each other's edits converge in near real time.
//!
//! ## Features
//!
//! - **Single authoritative copy**: the relay holds the one canonical document
//! - **Fan-out to peers**: accepted updates go to every session but the sender
//! - **Blank rejection**: empty or whitespace-only structures are never stored
//! - **Echo suppression**: participants skip values they already sent or applied
//! - **Late readiness**: updates arriving before the editor loads are queued
//!
//! Concurrent edits are not merged. Whichever update reaches the relay last
//! wins.
//!
//! ## Example
//!
//! ```rust
//! use molsync::{Document, Relay, UpdateOutcome};
//! use tokio::sync::mpsc;
//!
//! let mut relay = Relay::new();
//! let (tx_a, _rx_a) = mpsc::unbounded_channel();
//! let (tx_b, mut rx_b) = mpsc::unbounded_channel();
//! let a = relay.connect(tx_a);
//! let _b = relay.connect(tx_b);
//!
//! let outcome = relay.receive_update(a, Document::new("M  END"));
//! assert_eq!(outcome, UpdateOutcome::Broadcast { recipients: 1 });
//! assert!(rx_b.try_recv().is_ok()); // initial snapshot
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod types;

// Re-export the main public API
pub use error::{ClientError, EditorError, ServerError};
pub use protocol::Event;
pub use relay::{DocumentStore, Relay, RelayHandle, UpdateOutcome};
pub use types::{Document, SessionId};
