//! Events broadcast from the session actor to all subscribers.

use super::snapshot::SessionView;

/// Broadcast to every subscriber. Slow consumers may observe
/// `RecvError::Lagged` and should re-sync from the next `StateChanged`.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Snapshot after any status transition or applied move.
    StateChanged(SessionView),
    /// Human-readable note: authority status text, engine hiccups.
    Notice(String),
}
