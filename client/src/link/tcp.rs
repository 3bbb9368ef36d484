//! TCP transport: newline-delimited text frames over a `TcpStream`.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use super::{Connector, LinkError, Transport};

/// Connects to the authority over plain TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&mut self) -> Result<Box<dyn Transport>, LinkError> {
        debug!(addr = %self.addr, "connecting to authority");
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| LinkError::Connect(e.to_string()))?;
        let (read, write) = stream.into_split();
        Ok(Box::new(TcpTransport {
            reader: BufReader::new(read).lines(),
            writer: write,
        }))
    }
}

/// One frame per line. Inbound newlines are stripped by the line reader;
/// outbound frames get one appended.
pub struct TcpTransport {
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, frame: String) -> Result<(), LinkError> {
        self.writer
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| LinkError::Io(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(|e| LinkError::Io(e.to_string()))?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, LinkError>> {
        match self.reader.next_line().await {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => None,
            Err(e) => Some(Err(LinkError::Io(e.to_string()))),
        }
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| LinkError::Io(e.to_string()))
    }
}
