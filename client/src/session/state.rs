//! Internal session state. Owned by the actor task, never shared.

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::info;

use arena_engine::{EngineAdapter, EngineError, QueryParams};
use arena_protocol::{GameMode, PlayerColor};

use crate::config::ClientConfig;
use crate::game::GameState;
use crate::link::{LinkEvent, LinkHandle};

use super::snapshot::SessionView;

/// Lifecycle of one session.
///
/// `Terminated` is absorbing: nothing delivered afterwards changes the
/// status or the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Created, nothing started yet.
    Menu,
    /// Bringing up the authority link or the engine handshake.
    Connecting,
    /// Queued for matchmaking. `pending` carries the provisional id from
    /// `session_pending` once the authority acknowledges the queue entry.
    WaitingForOpponent { pending: Option<String> },
    /// A game is in progress.
    Active,
    /// The session is over.
    Terminated(TerminationReason),
}

impl SessionStatus {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    Checkmate { winner: PlayerColor },
    Stalemate,
    Draw,
    Resignation,
    Cancelled,
    OpponentDisconnected,
    Error,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            Self::Stalemate => write!(f, "stalemate"),
            Self::Draw => write!(f, "draw"),
            Self::Resignation => write!(f, "resignation"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::OpponentDisconnected => write!(f, "opponent disconnected"),
            Self::Error => write!(f, "session error"),
        }
    }
}

pub(crate) struct SessionState {
    pub mode: GameMode,
    pub config: ClientConfig,
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub local_color: Option<PlayerColor>,
    pub game: GameState,
    /// Outbound half of the authority link. Dropping it tears the link down
    /// once queued frames have drained.
    pub link: Option<LinkHandle>,
    /// Inbound link events. Kept after termination until the final `Closed`
    /// arrives so queued outbound frames reach the wire first.
    pub link_rx: Option<mpsc::Receiver<LinkEvent>>,
    pub engine: Option<EngineAdapter>,
    /// Consecutive undecodable or unusable frames from the authority.
    pub decode_faults: u32,
    /// Consecutive engine query failures.
    pub engine_faults: u32,
    /// Matchmaking expiry, armed while waiting for an opponent.
    pub deadline: Option<Instant>,
}

impl SessionState {
    pub fn new(mode: GameMode, config: ClientConfig) -> Self {
        Self {
            mode,
            config,
            status: SessionStatus::Menu,
            session_id: None,
            local_color: None,
            game: GameState::new(),
            link: None,
            link_rx: None,
            engine: None,
            decode_faults: 0,
            engine_faults: 0,
            deadline: None,
        }
    }

    pub fn with_link(
        mode: GameMode,
        config: ClientConfig,
        link: LinkHandle,
        link_rx: mpsc::Receiver<LinkEvent>,
    ) -> Self {
        Self {
            link: Some(link),
            link_rx: Some(link_rx),
            ..Self::new(mode, config)
        }
    }

    pub fn with_adapter(mode: GameMode, config: ClientConfig, adapter: EngineAdapter) -> Self {
        Self {
            engine: Some(adapter),
            ..Self::new(mode, config)
        }
    }

    /// Build a snapshot of the current state.
    pub fn view(&self) -> SessionView {
        SessionView {
            mode: self.mode,
            status: self.status.clone(),
            session_id: self.session_id.clone(),
            local_color: self.local_color,
            fen: self.game.to_fen(),
            side_to_move: self.game.side_to_move(),
            move_count: self.game.records().len(),
            records: self.game.records().to_vec(),
        }
    }

    /// Enter `Terminated`. Later calls are no-ops, whatever their reason.
    ///
    /// Dropping the link handle lets already queued frames drain before the
    /// transport closes; dropping the adapter shuts the engine down.
    pub fn terminate(&mut self, reason: TerminationReason) {
        if self.status.is_terminated() {
            return;
        }
        if self.session_id.is_none() {
            if let SessionStatus::WaitingForOpponent {
                pending: Some(pending),
            } = &self.status
            {
                self.session_id = Some(pending.clone());
            }
        }
        info!(%reason, "session terminated");
        self.status = SessionStatus::Terminated(reason);
        self.link = None;
        self.engine = None;
        self.deadline = None;
    }

    /// Whether an inbound frame naming `id` belongs to this session. The
    /// provisional matchmaking id counts as ours.
    pub fn owns_session_id(&self, id: &str) -> bool {
        match (&self.session_id, &self.status) {
            (Some(own), _) => own == id,
            (
                None,
                SessionStatus::WaitingForOpponent {
                    pending: Some(pending),
                },
            ) => pending == id,
            _ => false,
        }
    }

    /// Count one undecodable frame. Returns true once the consecutive run
    /// exceeds the configured budget and the link must be given up on.
    pub fn note_decode_fault(&mut self) -> bool {
        self.decode_faults += 1;
        self.decode_faults > self.config.max_decode_faults
    }

    /// Whether the engine owns the side to move and can be queried.
    pub fn engine_should_move(&self) -> bool {
        if !self.mode.is_engine() || self.status != SessionStatus::Active || self.game.is_over() {
            return false;
        }
        let Some(engine) = &self.engine else {
            return false;
        };
        if engine.query_outstanding() {
            return false;
        }
        match self.local_color {
            Some(color) => self.game.side_to_move() != color,
            None => false,
        }
    }

    /// Submit the current position to the engine.
    pub async fn query_engine(&mut self) -> Result<(), EngineError> {
        let params = QueryParams {
            depth: self.config.depth_for(self.mode),
            variants: self.config.variant_count,
        };
        let fen = self.game.to_fen();
        match self.engine.as_mut() {
            Some(engine) => engine.submit_position(&fen, params).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_engine::mock::mock_engine;

    #[test]
    fn test_new_state_is_menu() {
        let state = SessionState::new(GameMode::LocalPassAndPlay, ClientConfig::default());
        let view = state.view();
        assert_eq!(view.status, SessionStatus::Menu);
        assert_eq!(view.session_id, None);
        assert_eq!(view.local_color, None);
        assert_eq!(view.move_count, 0);
        assert_eq!(view.side_to_move, PlayerColor::White);
    }

    #[test]
    fn test_terminate_is_absorbing() {
        let mut state = SessionState::new(GameMode::LocalPassAndPlay, ClientConfig::default());
        state.status = SessionStatus::Active;
        state.terminate(TerminationReason::Cancelled);
        state.terminate(TerminationReason::Error);
        assert_eq!(
            state.status,
            SessionStatus::Terminated(TerminationReason::Cancelled)
        );
    }

    #[test]
    fn test_terminate_inherits_pending_id() {
        let mut state = SessionState::new(GameMode::VersusRemotePlayer, ClientConfig::default());
        state.status = SessionStatus::WaitingForOpponent {
            pending: Some("g9".into()),
        };
        state.terminate(TerminationReason::Cancelled);
        assert_eq!(state.session_id.as_deref(), Some("g9"));
    }

    #[test]
    fn test_owns_session_id_covers_pending() {
        let mut state = SessionState::new(GameMode::VersusRemotePlayer, ClientConfig::default());
        assert!(!state.owns_session_id("g1"));

        state.status = SessionStatus::WaitingForOpponent {
            pending: Some("g1".into()),
        };
        assert!(state.owns_session_id("g1"));
        assert!(!state.owns_session_id("g2"));

        state.session_id = Some("g2".into());
        assert!(state.owns_session_id("g2"));
        assert!(!state.owns_session_id("g1"));
    }

    #[test]
    fn test_decode_fault_budget() {
        let mut state = SessionState::new(GameMode::VersusRemotePlayer, ClientConfig::default());
        for _ in 0..state.config.max_decode_faults {
            assert!(!state.note_decode_fault());
        }
        assert!(state.note_decode_fault());

        state.decode_faults = 0;
        assert!(!state.note_decode_fault());
    }

    #[tokio::test]
    async fn test_engine_should_move_gates() {
        let mut state = SessionState::new(GameMode::LocalPassAndPlay, ClientConfig::default());
        state.status = SessionStatus::Active;
        assert!(!state.engine_should_move());

        let (io, _probe) = mock_engine();
        let adapter = EngineAdapter::start(io).unwrap();
        let mut state = SessionState::with_adapter(
            GameMode::VersusEngineEasy,
            ClientConfig::default(),
            adapter,
        );
        assert!(!state.engine_should_move());

        state.status = SessionStatus::Active;
        state.local_color = Some(PlayerColor::White);
        assert!(!state.engine_should_move());

        state.local_color = Some(PlayerColor::Black);
        assert!(state.engine_should_move());
    }
}
