//! Line-oriented engine I/O.
//!
//! The subprocess is owned by a single pump task that bridges it to the
//! adapter's channels; the [`EngineIo`] trait is the seam test doubles
//! implement.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::uci::{parse_engine_line, EngineReply};
use crate::{EngineConfig, EngineError};

/// One line in, one line out. Implementations must not buffer partial lines.
#[async_trait]
pub trait EngineIo: Send + 'static {
    async fn send_line(&mut self, line: &str) -> Result<(), EngineError>;
    /// `None` means the engine closed its side.
    async fn recv_line(&mut self) -> Option<Result<String, EngineError>>;
    async fn close(&mut self);
}

/// A spawned engine subprocess with line-buffered stdio.
pub struct ProcessIo {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl ProcessIo {
    /// Launch the engine binary from the config, or probe well-known
    /// locations when none is given.
    pub fn spawn(config: &EngineConfig) -> Result<Self, EngineError> {
        let path = match &config.binary {
            Some(path) => path.clone(),
            None => locate_engine().ok_or(EngineError::BinaryNotFound)?,
        };
        debug!(path = %path.display(), "spawning engine subprocess");

        let mut child = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {e}", path.display())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Spawn("no stdin handle".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("no stdout handle".into()))?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }
}

#[async_trait]
impl EngineIo for ProcessIo {
    async fn send_line(&mut self, line: &str) -> Result<(), EngineError> {
        trace!("uci >> {line}");
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn recv_line(&mut self) -> Option<Result<String, EngineError>> {
        match self.stdout.next_line().await {
            Ok(Some(line)) => {
                trace!("uci << {line}");
                Some(Ok(line))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e.into())),
        }
    }

    async fn close(&mut self) {
        let _ = self.send_line("quit").await;
        if tokio::time::timeout(Duration::from_secs(1), self.child.wait())
            .await
            .is_err()
        {
            warn!("engine ignored quit, killing");
            let _ = self.child.kill().await;
        }
    }
}

/// Output of the pump task, consumed by the adapter.
#[derive(Debug)]
pub(crate) enum PumpEvent {
    Reply(EngineReply),
    Malformed(String),
    /// Terminal; the pump exits right after sending it.
    Closed { detail: Option<String> },
}

/// Single owner of the io: forwards queued commands in, parsed replies out.
/// Exits when the command channel closes (adapter dropped) or the engine
/// side is lost, closing the io on the way out.
pub(crate) fn spawn_pump(
    io: impl EngineIo,
    cmd_rx: mpsc::Receiver<String>,
    reply_tx: mpsc::Sender<PumpEvent>,
) {
    tokio::spawn(pump_loop(io, cmd_rx, reply_tx));
}

async fn pump_loop(
    mut io: impl EngineIo,
    mut cmd_rx: mpsc::Receiver<String>,
    reply_tx: mpsc::Sender<PumpEvent>,
) {
    debug!("engine pump started");
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(line) => {
                        if let Err(e) = io.send_line(&line).await {
                            error!("engine write failed: {e}");
                            io.close().await;
                            let _ = reply_tx
                                .send(PumpEvent::Closed { detail: Some(e.to_string()) })
                                .await;
                            break;
                        }
                    }
                    None => {
                        debug!("adapter dropped, closing engine");
                        io.close().await;
                        break;
                    }
                }
            }

            incoming = io.recv_line() => {
                match incoming {
                    Some(Ok(line)) => match parse_engine_line(&line) {
                        Ok(Some(reply)) => {
                            if reply_tx.send(PumpEvent::Reply(reply)).await.is_err() {
                                io.close().await;
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("unparseable engine reply: {e}");
                            if reply_tx.send(PumpEvent::Malformed(line)).await.is_err() {
                                io.close().await;
                                break;
                            }
                        }
                    },
                    Some(Err(e)) => {
                        error!("engine read failed: {e}");
                        io.close().await;
                        let _ = reply_tx
                            .send(PumpEvent::Closed { detail: Some(e.to_string()) })
                            .await;
                        break;
                    }
                    None => {
                        debug!("engine closed its side");
                        let _ = reply_tx.send(PumpEvent::Closed { detail: None }).await;
                        break;
                    }
                }
            }
        }
    }
    debug!("engine pump exiting");
}

/// Probe well-known engine install locations, then `$PATH`.
pub(crate) fn locate_engine() -> Option<PathBuf> {
    let fixed = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];
    for candidate in fixed {
        let path = Path::new(candidate);
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join("stockfish"))
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::mock_engine;

    #[tokio::test]
    async fn test_pump_forwards_commands_and_replies() {
        let (io, mut probe) = mock_engine();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (reply_tx, mut reply_rx) = mpsc::channel(8);
        spawn_pump(io, cmd_rx, reply_tx);

        probe.feed_line("id name TestEngine");
        probe.feed_line("uciok");
        cmd_tx.send("uci".to_string()).await.unwrap();

        match reply_rx.recv().await {
            Some(PumpEvent::Reply(EngineReply::UciOk)) => {}
            other => panic!("expected uciok, got {other:?}"),
        }
        assert_eq!(probe.next_sent().await.as_deref(), Some("uci"));
    }

    #[tokio::test]
    async fn test_pump_reports_engine_loss() {
        let (io, mut probe) = mock_engine();
        let (_cmd_tx, cmd_rx) = mpsc::channel::<String>(8);
        let (reply_tx, mut reply_rx) = mpsc::channel(8);
        spawn_pump(io, cmd_rx, reply_tx);

        probe.feed_line("uciok");
        probe.hang_up();

        assert!(matches!(
            reply_rx.recv().await,
            Some(PumpEvent::Reply(EngineReply::UciOk))
        ));
        assert!(matches!(
            reply_rx.recv().await,
            Some(PumpEvent::Closed { detail: None })
        ));
        assert!(reply_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pump_closes_io_when_adapter_drops() {
        let (io, probe) = mock_engine();
        let (cmd_tx, cmd_rx) = mpsc::channel::<String>(8);
        let (reply_tx, _reply_rx) = mpsc::channel(8);
        spawn_pump(io, cmd_rx, reply_tx);

        drop(cmd_tx);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(probe.was_closed());
    }

    #[tokio::test]
    async fn test_pump_surfaces_malformed_replies() {
        let (io, probe) = mock_engine();
        let (_cmd_tx, cmd_rx) = mpsc::channel::<String>(8);
        let (reply_tx, mut reply_rx) = mpsc::channel(8);
        spawn_pump(io, cmd_rx, reply_tx);

        probe.feed_line("bestmove zz9x");
        match reply_rx.recv().await {
            Some(PumpEvent::Malformed(line)) => assert_eq!(line, "bestmove zz9x"),
            other => panic!("expected malformed event, got {other:?}"),
        }
    }
}
