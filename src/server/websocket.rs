//! WebSocket session management for structure synchronization.
//!
//! This module bridges one WebSocket connection to the relay: it registers
//! the session, pumps relay events out to the socket, and hands inbound
//! drawing updates to the relay.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::protocol::Event;
use crate::relay::RelayHandle;
use crate::types::SessionId;

/// One participant's connection
pub struct WebSocketSession {
    socket: WebSocket,
    relay: RelayHandle,
}

impl WebSocketSession {
    /// Create a new WebSocket session
    pub fn new(socket: WebSocket, relay: RelayHandle) -> Self {
        Self { socket, relay }
    }

    /// Handle the WebSocket connection lifecycle
    pub async fn handle(self) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let session_id = match self.relay.connect(outbox).await {
            Ok(id) => id,
            Err(e) => {
                error!("Could not register WebSocket session: {}", e);
                return;
            }
        };
        info!("WebSocket session {} established", session_id);

        let (sink, stream) = self.socket.split();
        let writer = spawn_writer(session_id, sink, inbox);

        read_loop(session_id, stream, &self.relay).await;

        if let Err(e) = self.relay.disconnect(session_id) {
            warn!("Could not release {}: {}", session_id, e);
        }
        writer.abort();
        info!("WebSocket session {} ended", session_id);
    }
}

/// Forward relay events queued for this session to the socket
fn spawn_writer(
    session_id: SessionId,
    mut sink: SplitSink<WebSocket, Message>,
    mut inbox: mpsc::UnboundedReceiver<Event>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to encode {} for {}: {}", event.name(), session_id, e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(json)).await {
                debug!("Failed to send {} to {}: {}", event.name(), session_id, e);
                break;
            }
        }
    })
}

/// Process incoming frames until the peer goes away
async fn read_loop(
    session_id: SessionId,
    mut stream: SplitStream<WebSocket>,
    relay: &RelayHandle,
) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if !handle_text_message(session_id, &text, relay) {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket session {} closed by client", session_id);
                break;
            }
            Ok(_) => {
                // Ignore other message types (binary, ping, pong)
            }
            Err(e) => {
                warn!("WebSocket error for {}: {}", session_id, e);
                break;
            }
        }
    }
}

/// Returns false when the relay is gone and the session should end
fn handle_text_message(session_id: SessionId, text: &str, relay: &RelayHandle) -> bool {
    match Event::from_json(text) {
        Ok(Event::DrawingUpdate(document)) => match relay.update(session_id, document) {
            Ok(()) => true,
            Err(e) => {
                error!("Dropping update from {}: {}", session_id, e);
                false
            }
        },
        Ok(event) => {
            warn!(
                "Ignoring {} event sent by client {}",
                event.name(),
                session_id
            );
            true
        }
        Err(e) => {
            // Don't break connection for malformed frames
            warn!("Failed to parse event from {}: {}", session_id, e);
            true
        }
    }
}

/// Create and handle a new WebSocket session
pub async fn handle_websocket_connection(socket: WebSocket, relay: RelayHandle) {
    WebSocketSession::new(socket, relay).handle().await;
}
