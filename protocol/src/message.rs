//! Messages carried on the authority link.
//!
//! Every frame is a single JSON object whose `kind` field selects the
//! variant. The unions are split by direction so the session controller's
//! inbound handling can be a total match.

use serde::{Deserialize, Serialize};

use crate::types::{ColorPreference, GameMode, GameOutcome, PlayerColor};

/// Messages the client sends to the session authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter matchmaking (or announce an engine-backed session to come).
    SessionInit {
        mode: GameMode,
        color_preference: ColorPreference,
    },
    /// A move made by the local player.
    Move {
        session_id: String,
        notation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        promotion: Option<char>,
    },
    /// Local rules engine detected a terminal position.
    TerminationNotice {
        session_id: String,
        outcome: GameOutcome,
        reason: String,
    },
    /// Local player resigns an active session.
    Forfeit { session_id: String },
    /// User abandoned before or during matchmaking. The id is present once
    /// the authority has acknowledged the queue entry.
    Cancel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// Propose restarting the same session from the initial position.
    ResetRequest { session_id: String },
}

/// Messages the session authority sends to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Queue entry acknowledged; pairing not complete yet.
    SessionPending { session_id: String },
    /// Pairing complete. `start_position` is a FEN string when the session
    /// does not begin from the standard start.
    SessionStart {
        session_id: String,
        assigned_color: PlayerColor,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_position: Option<String>,
    },
    /// A move made by the remote peer.
    Move {
        session_id: String,
        notation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        promotion: Option<char>,
    },
    /// Authority-pushed status text, surfaced to the user verbatim.
    SessionStatus {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        status: String,
    },
    /// The remote peer's link dropped.
    OpponentLeft { session_id: String },
    /// The authority rejected something we sent.
    ProtocolError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        message: String,
    },
}

impl ServerMessage {
    /// Session id named by the frame, when it names one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::SessionPending { session_id }
            | Self::SessionStart { session_id, .. }
            | Self::Move { session_id, .. }
            | Self::OpponentLeft { session_id } => Some(session_id),
            Self::SessionStatus { session_id, .. } | Self::ProtocolError { session_id, .. } => {
                session_id.as_deref()
            }
        }
    }
}
