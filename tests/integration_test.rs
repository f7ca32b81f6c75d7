//! Integration tests for the structure relay.
//!
//! These tests run the real server on an ephemeral port and drive it with
//! raw WebSocket clients and with full participants, checking snapshot
//! delivery, echo exclusion, blank rejection and convergence.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use molsync::client::{
    ClientCommand, EditorSlot, GateConfig, MemoryEditor, Participant, ReadySignal, Reconciler,
    SessionGate,
};
use molsync::server::serve;
use molsync::{ClientError, Document, Event, Relay, RelayHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_async, connect_async};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(300);

async fn start_server(initial: Document) -> (String, RelayHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let relay = RelayHandle::spawn(Relay::with_document(initial));
    tokio::spawn(serve(listener, relay.clone()));
    (format!("ws://{}", addr), relay)
}

async fn connect(base: &str) -> Ws {
    let (ws, _) = connect_async(format!("{base}/ws")).await.unwrap();
    ws
}

async fn next_event(ws: &mut Ws) -> Event {
    timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return Event::from_json(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

async fn expect_silence(ws: &mut Ws) {
    let res = timeout(QUIET, ws.next()).await;
    assert!(res.is_err(), "unexpected frame: {res:?}");
}

async fn send_update(ws: &mut Ws, text: &str) {
    let json = Event::DrawingUpdate(Document::new(text)).to_json().unwrap();
    ws.send(Message::Text(json)).await.unwrap();
}

async fn wait_for_store(relay: &RelayHandle, expected: &str) {
    timeout(WAIT, async {
        while relay.snapshot().await.unwrap().as_str() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("store never reached expected value");
}

async fn wait_for_editor(editor: &MemoryEditor, expected: &str) {
    timeout(WAIT, async {
        while editor.current().as_str() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("editor never reached expected value");
}

fn spawn_participant(
    url: String,
    ready: ReadySignal,
    mut commands: mpsc::Receiver<ClientCommand>,
) -> JoinHandle<Participant> {
    tokio::spawn(async move {
        let mut participant = Participant::new(ready);
        participant.run(&url, &mut commands).await.unwrap();
        participant
    })
}

fn status_messages(participant: &Participant) -> Vec<String> {
    participant
        .reconciler()
        .status()
        .entries()
        .map(|e| e.message.clone())
        .collect()
}

#[tokio::test]
async fn test_initial_snapshot_even_when_empty() {
    let (base, _relay) = start_server(Document::empty()).await;
    let mut ws = connect(&base).await;

    assert_eq!(
        next_event(&mut ws).await,
        Event::InitialStructure(Document::empty())
    );
    expect_silence(&mut ws).await;
}

#[tokio::test]
async fn test_late_join_snapshot_precedes_updates() {
    let (base, relay) = start_server(Document::empty()).await;
    let mut a = connect(&base).await;
    next_event(&mut a).await;

    send_update(&mut a, "V1").await;
    send_update(&mut a, "V2").await;
    wait_for_store(&relay, "V2").await;

    let mut b = connect(&base).await;
    assert_eq!(
        next_event(&mut b).await,
        Event::InitialStructure(Document::new("V2"))
    );

    send_update(&mut a, "V3").await;
    assert_eq!(
        next_event(&mut b).await,
        Event::DrawingUpdate(Document::new("V3"))
    );
}

#[tokio::test]
async fn test_broadcast_excludes_sender() {
    let (base, _relay) = start_server(Document::empty()).await;
    let mut a = connect(&base).await;
    let mut b = connect(&base).await;
    let mut c = connect(&base).await;
    next_event(&mut a).await;
    next_event(&mut b).await;
    next_event(&mut c).await;

    send_update(&mut a, "V1").await;

    assert_eq!(
        next_event(&mut b).await,
        Event::DrawingUpdate(Document::new("V1"))
    );
    assert_eq!(
        next_event(&mut c).await,
        Event::DrawingUpdate(Document::new("V1"))
    );
    expect_silence(&mut a).await;
}

#[tokio::test]
async fn test_blank_updates_never_stored_or_broadcast() {
    let (base, relay) = start_server(Document::new("M  END")).await;
    let mut a = connect(&base).await;
    let mut b = connect(&base).await;
    next_event(&mut a).await;
    next_event(&mut b).await;

    send_update(&mut a, "").await;
    send_update(&mut a, "  \n\t").await;
    expect_silence(&mut b).await;
    assert_eq!(relay.snapshot().await.unwrap().as_str(), "M  END");

    let mut late = connect(&base).await;
    assert_eq!(
        next_event(&mut late).await,
        Event::InitialStructure(Document::new("M  END"))
    );
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let (base, relay) = start_server(Document::empty()).await;
    let mut a = connect(&base).await;
    let mut b = connect(&base).await;
    next_event(&mut a).await;
    next_event(&mut b).await;

    a.send(Message::Text(r#"{"event":"drawingUpdate","data":42}"#.into()))
        .await
        .unwrap();
    a.send(Message::Text("not json".into())).await.unwrap();
    a.send(Message::Binary(vec![1, 2, 3])).await.unwrap();

    // Connection is still usable afterwards
    send_update(&mut a, "V1").await;
    assert_eq!(
        next_event(&mut b).await,
        Event::DrawingUpdate(Document::new("V1"))
    );
    assert_eq!(relay.snapshot().await.unwrap().as_str(), "V1");
}

#[tokio::test]
async fn test_disconnect_keeps_document() {
    let (base, relay) = start_server(Document::empty()).await;
    let mut a = connect(&base).await;
    next_event(&mut a).await;
    send_update(&mut a, "V1").await;
    wait_for_store(&relay, "V1").await;

    a.close(None).await.unwrap();
    drop(a);

    let mut b = connect(&base).await;
    assert_eq!(
        next_event(&mut b).await,
        Event::InitialStructure(Document::new("V1"))
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let (base, _relay) = start_server(Document::empty()).await;
    let addr = base.trim_start_matches("ws://");

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#""status":"ok""#));
}

#[tokio::test]
async fn test_participants_converge() {
    let (base, relay) = start_server(Document::empty()).await;
    let url = format!("{base}/ws");

    // A's editor is loaded before the gate is armed
    let editor_a = Arc::new(MemoryEditor::new());
    let (cmd_a, rx_a) = mpsc::channel(16);
    let task_a = spawn_participant(url.clone(), ReadySignal::ready(editor_a.clone()), rx_a);

    // B's editor shows up a little later
    let slot_b = EditorSlot::new();
    let editor_b = Arc::new(MemoryEditor::new());
    let (cmd_b, rx_b) = mpsc::channel(16);
    let ready_b = SessionGate::new(slot_b.clone(), GateConfig::default()).spawn();
    let task_b = spawn_participant(url.clone(), ready_b, rx_b);

    editor_a.draw("V1");
    tokio::time::sleep(Duration::from_millis(150)).await;
    slot_b.install(editor_b.clone());

    // Repeated sends are suppressed once the value went out
    timeout(WAIT, async {
        while editor_b.current().as_str() != "V1" {
            cmd_a.send(ClientCommand::Send).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("B never received V1");

    editor_b.draw("V2");
    timeout(WAIT, async {
        while editor_a.current().as_str() != "V2" {
            cmd_b.send(ClientCommand::Send).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("A never received V2");

    wait_for_editor(&editor_a, "V2").await;
    wait_for_store(&relay, "V2").await;

    cmd_a.send(ClientCommand::Shutdown).await.unwrap();
    cmd_b.send(ClientCommand::Shutdown).await.unwrap();
    let participant_a = task_a.await.unwrap();
    let participant_b = task_b.await.unwrap();
    let rec_a: &Reconciler = participant_a.reconciler();
    let rec_b: &Reconciler = participant_b.reconciler();

    assert_eq!(rec_a.last_known().as_str(), "V2");
    assert_eq!(rec_b.last_known().as_str(), "V2");
    // Each editor was written exactly once, by the other participant's value
    assert_eq!(editor_a.write_count(), 1);
    assert_eq!(editor_b.write_count(), 1);
    assert_eq!(rec_a.status().latest(), Some("Disconnected from server."));
}

#[tokio::test]
async fn test_shutdown_flushes_queued_update() {
    for i in 0..20 {
        let (base, relay) = start_server(Document::empty()).await;
        let value = format!("V{i}");
        let editor = Arc::new(MemoryEditor::with_document(Document::new(value.clone())));

        // Send and Shutdown are both waiting before the loop starts
        let (commands, rx) = mpsc::channel(4);
        commands.send(ClientCommand::Send).await.unwrap();
        commands.send(ClientCommand::Shutdown).await.unwrap();

        let participant =
            spawn_participant(format!("{base}/ws"), ReadySignal::ready(editor), rx)
                .await
                .unwrap();

        assert_eq!(participant.reconciler().last_known().as_str(), value);
        wait_for_store(&relay, &value).await;
    }
}

#[tokio::test]
async fn test_readiness_failure_reported() {
    let (base, relay) = start_server(Document::empty()).await;
    let slot = EditorSlot::new();
    let config = GateConfig {
        interval: Duration::from_millis(10),
        max_attempts: 3,
    };
    let ready = SessionGate::new(slot, config).spawn();

    let (commands, rx) = mpsc::channel(4);
    let task = spawn_participant(format!("{base}/ws"), ready, rx);

    tokio::time::sleep(Duration::from_millis(200)).await;
    commands.send(ClientCommand::Send).await.unwrap();
    commands.send(ClientCommand::Shutdown).await.unwrap();
    let participant = task.await.unwrap();

    let messages = status_messages(&participant);
    assert!(
        messages.contains(&"Error: editor API not found after 3 attempts.".to_string()),
        "{messages:?}"
    );
    assert!(
        messages.contains(&"Editor not ready. Cannot send structure.".to_string()),
        "{messages:?}"
    );
    assert!(!participant.reconciler().is_ready());
    assert_eq!(relay.snapshot().await.unwrap(), Document::empty());
}

#[tokio::test]
async fn test_connect_refused_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut participant = Participant::new(ReadySignal::ready(Arc::new(MemoryEditor::new())));
    let (_commands, mut rx) = mpsc::channel(1);
    let result = participant.run(&format!("ws://{addr}/ws"), &mut rx).await;

    assert!(matches!(result, Err(ClientError::Transport(_))));
    let latest = participant.reconciler().status().latest().unwrap();
    assert!(latest.starts_with("Connection error:"), "{latest}");
}

#[tokio::test]
async fn test_reconnect_after_relay_drop() {
    // A relay that sends its snapshot and then hangs up, twice
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        for _ in 0..2 {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let snapshot = Event::InitialStructure(Document::new("V1"));
            ws.send(Message::Text(snapshot.to_json().unwrap()))
                .await
                .unwrap();
            let _ = ws.close(None).await;
            while let Some(Ok(_)) = ws.next().await {}
        }
    });

    let editor = Arc::new(MemoryEditor::new());
    let mut participant = Participant::new(ReadySignal::ready(editor.clone()));
    let (_commands, mut rx) = mpsc::channel(1);
    let url = format!("ws://{addr}/ws");

    let _ = participant.run(&url, &mut rx).await;
    assert_eq!(
        participant.reconciler().status().latest(),
        Some("Disconnected from server.")
    );
    assert_eq!(editor.current().as_str(), "V1");
    assert_eq!(editor.write_count(), 1);

    // The snapshot after reconnecting is applied again
    let _ = participant.run(&url, &mut rx).await;
    assert_eq!(editor.write_count(), 2);
    assert_eq!(participant.reconciler().last_known().as_str(), "V1");

    server.await.unwrap();
}

#[tokio::test]
async fn test_in_process_convergence() {
    // Relay and reconcilers wired with plain channels, no sockets
    let mut relay = Relay::new();
    let mut participants = Vec::new();

    for _ in 0..3 {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let session = relay.connect(outbox);
        let (outbound, outgoing) = mpsc::unbounded_channel();
        let mut reconciler = Reconciler::new(outbound);
        let editor = Arc::new(MemoryEditor::new());
        reconciler
            .on_editor_ready(ReadySignal::ready(editor.clone()).await.unwrap())
            .await;
        participants.push((session, inbox, reconciler, outgoing, editor));
    }

    let edits = [(0, "V1"), (2, "V2"), (1, "V3"), (0, "V4")];
    for (who, value) in edits {
        participants[who].4.draw(value);
        participants[who].2.send().await.unwrap();

        // Deliver everything in flight
        for (session, _, _, outgoing, _) in participants.iter_mut() {
            while let Ok(Event::DrawingUpdate(doc)) = outgoing.try_recv() {
                relay.receive_update(*session, doc);
            }
        }
        for (_, inbox, reconciler, _, _) in participants.iter_mut() {
            while let Ok(event) = inbox.try_recv() {
                match event {
                    Event::InitialStructure(doc) => {
                        reconciler.on_initial_structure(doc).await;
                    }
                    Event::DrawingUpdate(doc) => {
                        reconciler.on_drawing_update(doc).await;
                    }
                }
            }
        }
    }

    assert_eq!(relay.document().as_str(), "V4");
    for (_, _, reconciler, _, editor) in &participants {
        assert_eq!(editor.current().as_str(), "V4");
        assert_eq!(reconciler.last_known().as_str(), "V4");
    }
}
