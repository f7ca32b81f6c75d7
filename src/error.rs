//! Error types for the relay server and the participant client.

use std::io;

use thiserror::Error;

/// A read or write rejected by the embedded editor widget
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("failed to read structure from editor: {0}")]
    Read(String),
    #[error("failed to write structure into editor: {0}")]
    Write(String),
}

/// Participant-side failures.
///
/// None of these are fatal to the process: callers log them and carry on.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The editor handle has not been located yet
    #[error("editor is not ready")]
    EditorUnavailable,

    #[error(transparent)]
    EditorOperationFailed(#[from] EditorError),

    /// The readiness probe gave up; only a reload recovers
    #[error("editor API not found after {attempts} attempts")]
    EditorNeverReady { attempts: u32 },

    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Outbound channel to the transport is gone
    #[error("connection to relay closed")]
    Disconnected,

    #[error("malformed event: {0}")]
    Protocol(String),
}

/// Server-side failures
#[derive(Debug, Error)]
pub enum ServerError {
    /// The relay task has stopped accepting commands
    #[error("relay task is no longer running")]
    RelayClosed,

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("server terminated: {0}")]
    Serve(#[source] io::Error),
}
