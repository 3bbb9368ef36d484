//! Cheap, cloneable handle for talking to a session actor.

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::{SessionError, SessionResult};

use super::commands::SessionCommand;
use super::events::SessionEvent;
use super::snapshot::SessionView;

/// Handle to a running session.
///
/// Clones share the same actor. The actor exits once every clone has been
/// dropped, tearing down its link or engine on the way out.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(cmd_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Submit a move for the local player in coordinate notation
    /// (`e2e4`, `e7e8q`). On success the returned view already includes
    /// the move, and any resulting termination.
    pub async fn submit_move(&self, notation: impl Into<String>) -> SessionResult<SessionView> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::SubmitMove {
            notation: notation.into(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    /// Restart the game from its initial position. Remote sessions only
    /// forward the request; the authority decides.
    pub async fn request_reset(&self) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::RequestReset { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    /// Abandon the session. Always succeeds; cancelling a terminated
    /// session is a no-op.
    pub async fn cancel(&self) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Cancel { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))?
    }

    /// Snapshot the current session state.
    pub async fn view(&self) -> SessionResult<SessionView> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetView { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    /// Get a snapshot together with a fresh event receiver. The receiver
    /// sees every event broadcast after the snapshot was taken.
    pub async fn subscribe(
        &self,
    ) -> SessionResult<(SessionView, broadcast::Receiver<SessionEvent>)> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Subscribe { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    async fn send(&self, cmd: SessionCommand) -> SessionResult<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::Internal("Session actor is gone".into()))
    }
}
