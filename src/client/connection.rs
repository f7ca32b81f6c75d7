//! Participant transport loop.
//!
//! Connects one participant to the relay over a WebSocket and routes
//! everything through its [`Reconciler`]: inbound events, the editor
//! readiness signal, user send requests, and outbound updates.

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::client::gate::{EditorReady, ReadySignal};
use crate::client::reconciler::Reconciler;
use crate::error::ClientError;
use crate::protocol::Event;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Requests a host can make of a running participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// The user pressed "send"
    Send,
    /// Close the connection and return
    Shutdown,
}

/// One participant: its reconciler, its outbound queue and the pending
/// editor readiness signal.
///
/// State outlives a single connection. After a transport failure the host
/// can read the status log and call [`Participant::run`] again to reconnect.
pub struct Participant {
    reconciler: Reconciler,
    outbound: mpsc::UnboundedReceiver<Event>,
    ready: Option<ReadySignal>,
}

impl Participant {
    pub fn new(ready: ReadySignal) -> Self {
        let (outbound_tx, outbound) = mpsc::unbounded_channel();
        Participant {
            reconciler: Reconciler::new(outbound_tx),
            outbound,
            ready: Some(ready),
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Runs one connection to the relay at `url`.
    ///
    /// Returns `Ok` when the relay closes the connection or the host asks
    /// for shutdown. Transport failures are recorded in the status log
    /// before being returned. Updates already handed to the outbound queue
    /// are written before the connection is closed on shutdown.
    pub async fn run(
        &mut self,
        url: &str,
        commands: &mut mpsc::Receiver<ClientCommand>,
    ) -> Result<(), ClientError> {
        let Participant {
            reconciler,
            outbound,
            ready,
        } = self;

        let (socket, _) = match connect_async(url).await {
            Ok(conn) => conn,
            Err(e) => {
                let e = ClientError::from(e);
                reconciler.on_connect_error(&e);
                return Err(e);
            }
        };
        info!("Connected to relay at {}", url);
        reconciler.on_connected();

        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                biased;

                Some(event) = outbound.recv() => {
                    if let Err(e) = deliver(&mut sink, &event).await {
                        reconciler.on_disconnected();
                        return Err(e);
                    }
                },
                result = wait_ready(ready), if ready.is_some() => {
                    *ready = None;
                    match result {
                        Ok(editor) => {
                            reconciler.on_editor_ready(editor).await;
                        }
                        Err(e) => reconciler.on_editor_failed(&e),
                    }
                },
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(reconciler, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        reconciler.on_disconnected();
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        reconciler.on_disconnected();
                        return Err(e.into());
                    }
                },
                command = commands.recv() => match command {
                    Some(ClientCommand::Send) => {
                        if let Err(e) = reconciler.send().await {
                            debug!("Send request not fulfilled: {}", e);
                        }
                    }
                    Some(ClientCommand::Shutdown) | None => {
                        while let Ok(event) = outbound.try_recv() {
                            if let Err(e) = deliver(&mut sink, &event).await {
                                reconciler.on_disconnected();
                                return Err(e);
                            }
                        }
                        let _ = sink.send(Message::Close(None)).await;
                        reconciler.on_disconnected();
                        return Ok(());
                    }
                },
            }
        }
    }
}

async fn wait_ready(ready: &mut Option<ReadySignal>) -> Result<EditorReady, ClientError> {
    match ready {
        Some(signal) => signal.await,
        None => Err(ClientError::EditorUnavailable),
    }
}

async fn deliver(sink: &mut WsSink, event: &Event) -> Result<(), ClientError> {
    let json = event
        .to_json()
        .map_err(|e| ClientError::Protocol(e.to_string()))?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

async fn handle_frame(reconciler: &mut Reconciler, text: &str) {
    match Event::from_json(text) {
        Ok(Event::InitialStructure(document)) => {
            let outcome = reconciler.on_initial_structure(document).await;
            debug!("Initial structure: {:?}", outcome);
        }
        Ok(Event::DrawingUpdate(document)) => {
            let outcome = reconciler.on_drawing_update(document).await;
            debug!("Drawing update: {:?}", outcome);
        }
        Err(e) => warn!("Ignoring frame from relay: {}", e),
    }
}
