//! Wire protocol shared between the session layer and the session authority.
//!
//! This crate owns the message vocabulary (tagged JSON text frames), the
//! stateless encode/decode codec, and the coordinate move notation helpers
//! used on both the authority link and the engine adapter.

pub mod codec;
pub mod message;
pub mod notation;
pub mod types;

pub use codec::{decode, encode, MAX_FRAME_LEN};
pub use message::{ClientMessage, ServerMessage};
pub use types::{ColorPreference, GameMode, GameOutcome, PlayerColor};

/// Errors produced while encoding, decoding, or parsing wire data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    EmptyFrame,

    #[error("frame of {0} bytes exceeds the frame limit")]
    OversizedFrame(usize),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("invalid move notation: {0}")]
    InvalidMove(String),

    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error("invalid promotion piece: {0}")]
    InvalidPromotion(String),
}
