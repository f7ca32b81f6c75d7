//! Readiness detection for the embedded editor.
//!
//! The editor loads asynchronously and announces nothing when it is done, so
//! the gate polls its well-known handle on a fixed interval for a bounded
//! number of attempts. Callers never poll themselves: they await a single
//! [`ReadySignal`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::client::editor::{Editor, EditorProbe};
use crate::error::ClientError;

/// Polling schedule for the readiness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            interval: Duration::from_millis(100),
            max_attempts: 50,
        }
    }
}

/// A located editor and how long it took to find
#[derive(Clone)]
pub struct EditorReady {
    pub editor: Arc<dyn Editor>,
    /// Polling ticks before the handle was found; zero when it was already
    /// reachable at construction
    pub attempts: u32,
    pub waited: Duration,
}

impl std::fmt::Debug for EditorReady {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorReady")
            .field("attempts", &self.attempts)
            .field("waited", &self.waited)
            .finish_non_exhaustive()
    }
}

/// Bounded-retry probe for the editor handle
pub struct SessionGate<P> {
    probe: P,
    config: GateConfig,
    found: Option<Arc<dyn Editor>>,
}

impl<P: EditorProbe> SessionGate<P> {
    /// Arms the gate. If the handle is already reachable the gate is
    /// satisfied immediately and will never poll.
    pub fn new(probe: P, config: GateConfig) -> Self {
        let found = probe.locate();
        SessionGate {
            probe,
            config,
            found,
        }
    }

    /// True if the editor was reachable when the gate was armed
    pub fn is_ready(&self) -> bool {
        self.found.is_some()
    }

    /// Polls until the editor is found or the attempt budget runs out.
    ///
    /// Exhaustion is terminal: no further probing happens after the error is
    /// returned.
    pub async fn wait(self) -> Result<EditorReady, ClientError> {
        if let Some(editor) = self.found {
            return Ok(EditorReady {
                editor,
                attempts: 0,
                waited: Duration::ZERO,
            });
        }

        let GateConfig {
            interval,
            max_attempts,
        } = self.config;

        for attempt in 1..=max_attempts {
            tokio::time::sleep(interval).await;
            if let Some(editor) = self.probe.locate() {
                return Ok(EditorReady {
                    editor,
                    attempts: attempt,
                    waited: interval * attempt,
                });
            }
            debug!(
                "Attempt {}/{}: editor API not yet found",
                attempt, max_attempts
            );
        }

        warn!("Editor API not found after {} attempts", max_attempts);
        Err(ClientError::EditorNeverReady {
            attempts: max_attempts,
        })
    }

    /// Runs the probe on its own task and returns the one-shot result
    pub fn spawn(self) -> ReadySignal
    where
        P: 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(self.wait().await);
        });
        ReadySignal { rx }
    }
}

/// Resolves once with the gate's verdict
#[derive(Debug)]
pub struct ReadySignal {
    rx: oneshot::Receiver<Result<EditorReady, ClientError>>,
}

impl ReadySignal {
    /// A signal that is already resolved with `editor`
    pub fn ready(editor: Arc<dyn Editor>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Ok(EditorReady {
            editor,
            attempts: 0,
            waited: Duration::ZERO,
        }));
        ReadySignal { rx }
    }
}

impl Future for ReadySignal {
    type Output = Result<EditorReady, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(ClientError::EditorUnavailable)))
    }
}
