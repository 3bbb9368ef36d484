//! Session layer for arena chess games.
//!
//! Drives one game session from menu to game over: local pass-and-play,
//! versus a remote player through the arena authority, or versus a local UCI
//! engine. A single actor task owns all session state; UIs talk to it through
//! a cloneable [`SessionHandle`] and watch it through broadcast
//! [`SessionEvent`]s.
//!
//! # Example
//!
//! ```no_run
//! use arena_client::{start, ClientConfig, GameMode, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env();
//!     let (session, mut events) = start(GameMode::LocalPassAndPlay, config)?;
//!     session.submit_move("e2e4").await?;
//!     while let Ok(event) = events.recv().await {
//!         if let SessionEvent::StateChanged(view) = event {
//!             println!("{}", view.fen);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod game;
pub mod link;
mod session;

pub use config::ClientConfig;
pub use error::{SessionError, SessionResult};
pub use game::{MoveOrigin, MoveRecord, TerminalKind};
pub use session::{
    start, start_with_adapter, start_with_connector, SessionEvent, SessionHandle, SessionStatus,
    SessionView, TerminationReason,
};

// Re-export wire vocabulary for convenience
pub use arena_protocol::{ColorPreference, GameMode, GameOutcome, PlayerColor};
