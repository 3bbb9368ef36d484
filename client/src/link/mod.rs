//! Connection manager: a persistent text-frame link to the session
//! authority.
//!
//! A single background task owns the transport. The controller talks to it
//! through a [`LinkHandle`] (outbound frames) and an event receiver (inbound
//! frames plus lifecycle). The link never interprets frame contents; decode
//! happens at the controller boundary.

mod tcp;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use tcp::{TcpConnector, TcpTransport};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capacity of the outbound frame queue.
const OUTBOUND_CHANNEL_CAPACITY: usize = 32;

/// Capacity of the link event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Link I/O error: {0}")]
    Io(String),

    #[error("Link closed")]
    Closed,
}

/// One bidirectional text-frame connection.
#[async_trait]
pub trait Transport: Send {
    /// Transmit one frame (framing is the transport's concern).
    async fn send(&mut self, frame: String) -> Result<(), LinkError>;

    /// Next inbound frame. `None` means the remote end closed the stream.
    async fn recv(&mut self) -> Option<Result<String, LinkError>>;

    /// Tear the connection down.
    async fn close(&mut self) -> Result<(), LinkError>;
}

/// Produces the transport for one link. The connect step runs inside the
/// link task so connection failures surface as link events, not panics.
#[async_trait]
pub trait Connector: Send + 'static {
    async fn connect(&mut self) -> Result<Box<dyn Transport>, LinkError>;
}

/// Lifecycle and traffic of one link, in order. `Closed` is delivered
/// exactly once, last; `clean` is true only for a locally requested
/// teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Established,
    Frame(String),
    Closed {
        clean: bool,
        detail: Option<String>,
    },
}

/// Cheap, cloneable sender half of a link. Dropping every clone tears the
/// link down gracefully; queued frames drain first.
#[derive(Clone)]
pub struct LinkHandle {
    out_tx: mpsc::Sender<String>,
}

impl LinkHandle {
    /// Queue a frame for transmission.
    pub async fn send(&self, frame: String) -> Result<(), LinkError> {
        self.out_tx.send(frame).await.map_err(|_| LinkError::Closed)
    }
}

/// Spawn the link task: connect, then pump frames both ways until either
/// side closes.
pub fn spawn_link(connector: impl Connector) -> (LinkHandle, mpsc::Receiver<LinkEvent>) {
    let (out_tx, out_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(link_loop(connector, out_rx, event_tx));
    (LinkHandle { out_tx }, event_rx)
}

async fn link_loop(
    mut connector: impl Connector,
    mut out_rx: mpsc::Receiver<String>,
    event_tx: mpsc::Sender<LinkEvent>,
) {
    debug!("link task started");

    let mut transport = match connector.connect().await {
        Ok(transport) => transport,
        Err(e) => {
            warn!("connect failed: {e}");
            let _ = event_tx
                .send(LinkEvent::Closed {
                    clean: false,
                    detail: Some(e.to_string()),
                })
                .await;
            return;
        }
    };
    let _ = event_tx.send(LinkEvent::Established).await;

    loop {
        tokio::select! {
            frame = out_rx.recv() => {
                match frame {
                    Some(frame) => {
                        debug!(frame = %frame, "frame out");
                        if let Err(e) = transport.send(frame).await {
                            warn!("link send failed: {e}");
                            let _ = event_tx.send(LinkEvent::Closed {
                                clean: false,
                                detail: Some(e.to_string()),
                            }).await;
                            break;
                        }
                    }
                    // Every handle dropped: locally requested teardown.
                    None => {
                        debug!("outbound queue closed, tearing down link");
                        let _ = transport.close().await;
                        let _ = event_tx.send(LinkEvent::Closed {
                            clean: true,
                            detail: None,
                        }).await;
                        break;
                    }
                }
            }

            inbound = transport.recv() => {
                match inbound {
                    Some(Ok(frame)) => {
                        debug!(frame = %frame, "frame in");
                        if event_tx.send(LinkEvent::Frame(frame)).await.is_err() {
                            // Consumer is gone; nothing left to deliver to.
                            let _ = transport.close().await;
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("link receive failed: {e}");
                        let _ = event_tx.send(LinkEvent::Closed {
                            clean: false,
                            detail: Some(e.to_string()),
                        }).await;
                        break;
                    }
                    // Remote end closed the stream under us.
                    None => {
                        debug!("remote end closed the link");
                        let _ = event_tx.send(LinkEvent::Closed {
                            clean: false,
                            detail: None,
                        }).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("link task exited");
}

#[cfg(test)]
mod tests {
    use super::mock::{failing_connector, mock_connector, mock_transport};
    use super::*;

    #[tokio::test]
    async fn test_link_pumps_frames_both_ways() {
        let (transport, mut probe) = mock_transport();
        let (handle, mut events) = spawn_link(mock_connector(transport));

        assert_eq!(events.recv().await, Some(LinkEvent::Established));

        probe.feed_frame("inbound-frame");
        assert_eq!(
            events.recv().await,
            Some(LinkEvent::Frame("inbound-frame".into()))
        );

        handle.send("outbound-frame".into()).await.unwrap();
        assert_eq!(probe.next_frame().await.as_deref(), Some("outbound-frame"));
    }

    #[tokio::test]
    async fn test_handle_drop_closes_cleanly_after_drain() {
        let (transport, mut probe) = mock_transport();
        let (handle, mut events) = spawn_link(mock_connector(transport));
        assert_eq!(events.recv().await, Some(LinkEvent::Established));

        // The queued frame must still go out before the close.
        handle.send("last-words".into()).await.unwrap();
        drop(handle);

        assert_eq!(probe.next_frame().await.as_deref(), Some("last-words"));
        assert_eq!(
            events.recv().await,
            Some(LinkEvent::Closed {
                clean: true,
                detail: None
            })
        );
        assert_eq!(events.recv().await, None);
        assert!(probe.was_closed());
    }

    #[tokio::test]
    async fn test_remote_eof_is_unclean() {
        let (transport, mut probe) = mock_transport();
        let (_handle, mut events) = spawn_link(mock_connector(transport));
        assert_eq!(events.recv().await, Some(LinkEvent::Established));

        probe.hang_up();
        assert_eq!(
            events.recv().await,
            Some(LinkEvent::Closed {
                clean: false,
                detail: None
            })
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_unclean_with_detail() {
        let (transport, probe) = mock_transport();
        let (_handle, mut events) = spawn_link(mock_connector(transport));
        assert_eq!(events.recv().await, Some(LinkEvent::Established));

        probe.feed_error(LinkError::Io("wire cut".into()));
        match events.recv().await {
            Some(LinkEvent::Closed {
                clean: false,
                detail: Some(detail),
            }) => assert!(detail.contains("wire cut")),
            other => panic!("expected unclean close, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces_closed() {
        let (_handle, mut events) = spawn_link(failing_connector("nobody listening"));
        match events.recv().await {
            Some(LinkEvent::Closed {
                clean: false,
                detail: Some(detail),
            }) => assert!(detail.contains("nobody listening")),
            other => panic!("expected connect failure, got {other:?}"),
        }
        assert_eq!(events.recv().await, None);
    }
}
