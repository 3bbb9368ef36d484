//! Commands sent to the session actor. Each embeds a oneshot for the reply.

use tokio::sync::{broadcast, oneshot};

use crate::error::SessionError;

use super::events::SessionEvent;
use super::snapshot::SessionView;

pub enum SessionCommand {
    /// Apply a local move given in coordinate notation.
    SubmitMove {
        notation: String,
        reply: oneshot::Sender<Result<SessionView, SessionError>>,
    },
    /// Restart from the initial position (local/engine), or ask the
    /// authority to (remote).
    RequestReset {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Abandon the session from whatever state it is in.
    Cancel {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Snapshot the current state.
    GetView { reply: oneshot::Sender<SessionView> },
    /// Snapshot plus a fresh event receiver, atomically.
    Subscribe {
        reply: oneshot::Sender<(SessionView, broadcast::Receiver<SessionEvent>)>,
    },
}
