//! Move-suggestion adapter over a UCI engine subprocess.
//!
//! The adapter exposes a narrow request/response surface: submit one
//! position, receive one suggestion (or an explicit no-move reply). At most
//! one query may be outstanding; the guard lives here so callers cannot get
//! it wrong. Engine strength is driven purely by search depth.

pub mod adapter;
pub mod io;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod uci;

pub use adapter::EngineAdapter;
pub use io::{EngineIo, ProcessIo};

use std::path::PathBuf;

/// Engine launch configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Explicit engine binary. When unset, well-known locations are probed.
    pub binary: Option<PathBuf>,
}

/// Parameters for one suggestion query.
#[derive(Debug, Clone, Copy)]
pub struct QueryParams {
    /// Search depth in plies.
    pub depth: u8,
    /// Number of candidate lines to request. 1 means best move only.
    pub variants: u8,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            depth: 2,
            variants: 1,
        }
    }
}

/// A resolved suggestion query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSuggestion {
    /// Best move in coordinate notation, standard castling form.
    pub best: String,
    /// Principal move of each additional requested variant, best first.
    pub alternatives: Vec<String>,
}

/// Events surfaced to the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Handshake complete; the engine accepts queries.
    Ready,
    /// The outstanding query resolved with a move.
    Suggestion(EngineSuggestion),
    /// The outstanding query resolved with no legal move available.
    NoMove,
    /// The engine misbehaved or the subprocess was lost.
    Fault(String),
}

/// Errors from the adapter surface.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine binary not found")]
    BinaryNotFound,

    #[error("failed to spawn engine: {0}")]
    Spawn(String),

    #[error("engine io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("a query is already outstanding")]
    QueryOutstanding,

    #[error("engine connection closed")]
    Closed,

    #[error("malformed engine reply: {0}")]
    MalformedReply(String),
}
