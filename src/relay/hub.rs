//! Core relay state machine.
//!
//! The relay owns the document store and the set of live sessions. It is
//! purely synchronous: every method runs to completion, and the caller (the
//! relay task in [`crate::relay::handle`]) feeds it one command at a time.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::Event;
use crate::relay::store::DocumentStore;
use crate::types::{Document, SessionId};

/// Per-session queue of events waiting to be written to the socket
pub type Outbox = mpsc::UnboundedSender<Event>;

/// Result of handing an update to the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The payload was blank; nothing was stored or sent
    Rejected,
    /// The payload was stored and forwarded to this many other sessions
    Broadcast { recipients: usize },
}

/// The Update Relay.
///
/// # Design
///
/// - Single owner of the [`DocumentStore`], so store writes never interleave
/// - Broadcast is an explicit walk over every live session except the sender
/// - Sessions whose outbox has closed are pruned during broadcast
/// - Last write wins: concurrent edits are not merged
#[derive(Debug, Default)]
pub struct Relay {
    store: DocumentStore,
    sessions: BTreeMap<SessionId, Outbox>,
    next_session: u64,
}

impl Relay {
    /// Creates a relay with an empty document and no sessions
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a relay whose store already holds `document`
    pub fn with_document(document: Document) -> Self {
        Relay {
            store: DocumentStore::with_document(document),
            ..Self::default()
        }
    }

    /// Registers a new session and queues its initial snapshot.
    ///
    /// The snapshot is pushed before the session joins the broadcast set, so
    /// it is always the first event the session sees. The current document is
    /// sent even when it is empty.
    pub fn connect(&mut self, outbox: Outbox) -> SessionId {
        let session = SessionId(self.next_session);
        self.next_session += 1;

        let snapshot = Event::InitialStructure(self.store.read().clone());
        if outbox.send(snapshot).is_err() {
            debug!("{} closed before its snapshot could be queued", session);
            return session;
        }

        self.sessions.insert(session, outbox);
        info!(
            "{} connected ({} live sessions)",
            session,
            self.sessions.len()
        );
        session
    }

    /// Accepts an update from `from`, stores it and forwards it to all other
    /// sessions.
    ///
    /// Blank payloads are dropped without touching the store or notifying
    /// anyone.
    pub fn receive_update(&mut self, from: SessionId, payload: Document) -> UpdateOutcome {
        if payload.is_blank() {
            warn!("Dropping blank drawing update from {}", from);
            return UpdateOutcome::Rejected;
        }

        info!(
            "Received drawing update from {}: {}",
            from,
            payload.preview()
        );
        self.store.write(payload.clone());

        let mut recipients = 0;
        let mut closed = Vec::new();
        for (&session, outbox) in &self.sessions {
            if session == from {
                continue;
            }
            match outbox.send(Event::DrawingUpdate(payload.clone())) {
                Ok(()) => recipients += 1,
                Err(_) => closed.push(session),
            }
        }

        for session in closed {
            self.sessions.remove(&session);
            debug!("Pruned {} after its outbox closed", session);
        }

        UpdateOutcome::Broadcast { recipients }
    }

    /// Releases a session. The document is left untouched.
    ///
    /// Returns false if the session was not registered.
    pub fn disconnect(&mut self, session: SessionId) -> bool {
        let removed = self.sessions.remove(&session).is_some();
        if removed {
            info!(
                "{} disconnected ({} live sessions)",
                session,
                self.sessions.len()
            );
        }
        removed
    }

    /// Current canonical document
    pub fn document(&self) -> &Document {
        self.store.read()
    }

    /// Number of sessions currently in the broadcast set
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_connected(&self, session: SessionId) -> bool {
        self.sessions.contains_key(&session)
    }
}
