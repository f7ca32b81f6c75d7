//! Relay task and the cloneable handle used by connections to reach it.
//!
//! All connection, update and disconnect handling funnels through one
//! command queue drained by one task. That task is the only place the
//! [`Relay`] is touched, which gives mutual exclusion without locks.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::ServerError;
use crate::relay::hub::{Outbox, Relay};
use crate::types::{Document, SessionId};

enum Command {
    Connect {
        outbox: Outbox,
        reply: oneshot::Sender<SessionId>,
    },
    Update {
        from: SessionId,
        payload: Document,
    },
    Disconnect {
        session: SessionId,
    },
    Snapshot {
        reply: oneshot::Sender<Document>,
    },
}

/// Cheap, cloneable entry point to the running relay task
#[derive(Clone, Debug)]
pub struct RelayHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Connect { .. } => f.write_str("Connect"),
            Command::Update { from, .. } => write!(f, "Update({from})"),
            Command::Disconnect { session } => write!(f, "Disconnect({session})"),
            Command::Snapshot { .. } => f.write_str("Snapshot"),
        }
    }
}

impl RelayHandle {
    /// Moves `relay` onto its own task and returns a handle to it.
    ///
    /// The task exits once every handle has been dropped.
    pub fn spawn(relay: Relay) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(relay, rx));
        RelayHandle { commands }
    }

    /// Registers a session; its snapshot is queued on `outbox` before this
    /// returns.
    pub async fn connect(&self, outbox: Outbox) -> Result<SessionId, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Connect { outbox, reply })?;
        rx.await.map_err(|_| ServerError::RelayClosed)
    }

    /// Queues an update from `from`. Processing order matches call order.
    pub fn update(&self, from: SessionId, payload: Document) -> Result<(), ServerError> {
        self.send(Command::Update { from, payload })
    }

    pub fn disconnect(&self, session: SessionId) -> Result<(), ServerError> {
        self.send(Command::Disconnect { session })
    }

    /// Reads the canonical document as of every previously queued command
    pub async fn snapshot(&self) -> Result<Document, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        rx.await.map_err(|_| ServerError::RelayClosed)
    }

    fn send(&self, command: Command) -> Result<(), ServerError> {
        self.commands
            .send(command)
            .map_err(|_| ServerError::RelayClosed)
    }
}

async fn run(mut relay: Relay, mut commands: mpsc::UnboundedReceiver<Command>) {
    info!("Relay task started");

    while let Some(command) = commands.recv().await {
        debug!("Relay processing {:?}", command);
        match command {
            Command::Connect { outbox, reply } => {
                let session = relay.connect(outbox);
                if reply.send(session).is_err() {
                    // Caller went away mid-handshake
                    relay.disconnect(session);
                }
            }
            Command::Update { from, payload } => {
                relay.receive_update(from, payload);
            }
            Command::Disconnect { session } => {
                relay.disconnect(session);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(relay.document().clone());
            }
        }
    }

    info!("Relay task stopped");
}
