//! Channel-driven transport double for tests.
//!
//! The probe end scripts authority frames and observes the frames the link
//! sends, so tests can interleave feeding and asserting. Frames can be fed
//! and read either raw or as typed wire messages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use arena_protocol::{ClientMessage, ServerMessage};

use super::{Connector, LinkError, Transport};

/// Fake transport. Frames fed through the probe come out of `recv`; frames
/// sent by the link are recorded on the probe.
pub struct MockTransport {
    inbound: mpsc::UnboundedReceiver<Result<String, LinkError>>,
    sent: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

/// Test-side end of a [`MockTransport`].
pub struct LinkProbe {
    inbound: Option<mpsc::UnboundedSender<Result<String, LinkError>>>,
    sent: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

/// Build a connected transport/probe pair.
pub fn mock_transport() -> (MockTransport, LinkProbe) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));

    let transport = MockTransport {
        inbound: in_rx,
        sent: sent_tx,
        closed: Arc::clone(&closed),
    };
    let probe = LinkProbe {
        inbound: Some(in_tx),
        sent: sent_rx,
        closed,
    };
    (transport, probe)
}

/// Connector that yields the given transport on first use.
pub fn mock_connector(transport: MockTransport) -> MockConnector {
    MockConnector {
        transport: Some(transport),
        fail: None,
    }
}

/// Connector whose connect step fails with the given detail.
pub fn failing_connector(detail: impl Into<String>) -> MockConnector {
    MockConnector {
        transport: None,
        fail: Some(detail.into()),
    }
}

pub struct MockConnector {
    transport: Option<MockTransport>,
    fail: Option<String>,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&mut self) -> Result<Box<dyn Transport>, LinkError> {
        if let Some(detail) = &self.fail {
            return Err(LinkError::Connect(detail.clone()));
        }
        match self.transport.take() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(LinkError::Connect("transport already taken".into())),
        }
    }
}

impl LinkProbe {
    /// Script one raw inbound frame.
    pub fn feed_frame(&self, frame: impl Into<String>) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Ok(frame.into()));
        }
    }

    /// Script an inbound message, encoded the way the authority encodes it.
    pub fn feed_message(&self, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(frame) => self.feed_frame(frame),
            Err(e) => panic!("server message failed to serialize: {e}"),
        }
    }

    /// Script a transport-level receive error.
    pub fn feed_error(&self, err: LinkError) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Err(err));
        }
    }

    /// Simulate the remote end closing the stream (EOF after anything
    /// already fed).
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Next frame the link sent, raw and in order.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// Next frame the link sent, decoded as a client message. Panics on a
    /// frame that is not one, and after 5 seconds without traffic.
    pub async fn next_message(&mut self) -> Option<ClientMessage> {
        let wait = tokio::time::timeout(Duration::from_secs(5), self.sent.recv());
        match wait.await {
            Ok(Some(frame)) => match serde_json::from_str(&frame) {
                Ok(msg) => Some(msg),
                Err(e) => panic!("outbound frame is not a client message: {e} (raw: {frame})"),
            },
            Ok(None) => None,
            Err(_) => panic!("timed out waiting for an outbound frame"),
        }
    }

    /// Whether the link closed the transport.
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: String) -> Result<(), LinkError> {
        let _ = self.sent.send(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, LinkError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}
