//! Error types for the session layer

use thiserror::Error;

use crate::game::GameError;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Not your turn")]
    NotYourTurn,

    #[error("No active game")]
    NotActive,

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<GameError> for SessionError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::IllegalMove(notation) => Self::IllegalMove(notation),
            GameError::InvalidFen(fen) => Self::InvalidFen(fen),
            GameError::GameOver => Self::NotActive,
        }
    }
}
