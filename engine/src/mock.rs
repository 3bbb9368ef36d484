//! Channel-driven engine double for tests.
//!
//! The probe end scripts engine output and observes the lines the adapter
//! writes, so tests can interleave feeding and asserting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::io::EngineIo;
use crate::EngineError;

/// Fake engine io. Lines fed through the probe come out of `recv_line`;
/// lines written by the adapter are recorded on the probe.
pub struct MockEngineIo {
    lines: mpsc::UnboundedReceiver<String>,
    sent: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

/// Test-side end of a [`MockEngineIo`].
pub struct EngineProbe {
    lines: Option<mpsc::UnboundedSender<String>>,
    sent: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

/// Build a connected io/probe pair.
pub fn mock_engine() -> (MockEngineIo, EngineProbe) {
    let (line_tx, line_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));

    let io = MockEngineIo {
        lines: line_rx,
        sent: sent_tx,
        closed: Arc::clone(&closed),
    };
    let probe = EngineProbe {
        lines: Some(line_tx),
        sent: sent_rx,
        closed,
    };
    (io, probe)
}

impl EngineProbe {
    /// Script one line of engine output.
    pub fn feed_line(&self, line: impl Into<String>) {
        if let Some(tx) = &self.lines {
            let _ = tx.send(line.into());
        }
    }

    /// Script the usual identify/handshake exchange.
    pub fn feed_handshake(&self) {
        self.feed_line("id name MockEngine");
        self.feed_line("uciok");
        self.feed_line("readyok");
    }

    /// Simulate the engine process dying (EOF on its output).
    pub fn hang_up(&mut self) {
        self.lines = None;
    }

    /// Next line the adapter wrote, in order.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// Wait until the adapter writes `expected`, skipping unrelated lines.
    /// Panics if the writer goes away or nothing matches within 5 seconds.
    pub async fn expect_sent(&mut self, expected: &str) {
        let wait = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(line) = self.sent.recv().await {
                if line == expected {
                    return true;
                }
            }
            false
        });
        match wait.await {
            Ok(true) => {}
            Ok(false) => panic!("adapter hung up before sending {expected:?}"),
            Err(_) => panic!("timed out waiting for {expected:?}"),
        }
    }

    /// Whether the adapter closed the engine side.
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EngineIo for MockEngineIo {
    async fn send_line(&mut self, line: &str) -> Result<(), EngineError> {
        let _ = self.sent.send(line.to_string());
        Ok(())
    }

    async fn recv_line(&mut self) -> Option<Result<String, EngineError>> {
        self.lines.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}
