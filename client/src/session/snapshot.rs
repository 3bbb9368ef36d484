//! Immutable view of session state handed to callers and subscribers.

use arena_protocol::{GameMode, PlayerColor};

use crate::game::MoveRecord;

use super::state::SessionStatus;

/// Complete, immutable snapshot of a session.
///
/// Returned from [`SessionHandle::view`](super::SessionHandle::view) and
/// carried by every `StateChanged` event. Holding one never blocks or
/// observes the actor.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub mode: GameMode,
    pub status: SessionStatus,
    /// Authority-assigned id. `None` until a remote session activates, and
    /// always `None` for local and engine sessions.
    pub session_id: Option<String>,
    /// Which side local input controls. `None` in pass-and-play, where the
    /// user plays both.
    pub local_color: Option<PlayerColor>,
    /// Current position as FEN.
    pub fen: String,
    pub side_to_move: PlayerColor,
    pub move_count: usize,
    /// Applied moves in order, oldest first.
    pub records: Vec<MoveRecord>,
}
