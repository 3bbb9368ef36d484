//! Game state wrapper around the cozy-chess rules engine.
//!
//! Owns the board plus the append-only move record. Moves from every
//! source go through the same [`GameState::apply`] path, so legality
//! checking and notation normalisation happen exactly once.

use std::str::FromStr;

use cozy_chess::{Board, GameStatus, Move, Piece};

use arena_protocol::{notation, PlayerColor};

/// Where a recorded move came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOrigin {
    LocalInput,
    RemotePeer,
    EngineAdapter,
}

/// What a move produced, when it ended the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    Checkmate,
    Stalemate,
    Draw,
}

/// One applied move, sufficient to replay the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    /// Coordinate notation in wire form, promotion fused (`"e2e4"`,
    /// `"e7e8q"`, castling as the two-square king move).
    pub notation: String,
    pub origin: MoveOrigin,
    /// Set when this move ended the game.
    pub resulting: Option<TerminalKind>,
}

/// Starting position of the game.
#[derive(Debug, Clone)]
enum StartPosition {
    Standard,
    Custom(Board),
}

/// Board state plus the move record.
#[derive(Debug, Clone)]
pub struct GameState {
    position: Board,
    records: Vec<MoveRecord>,
    start: StartPosition,
}

impl GameState {
    /// Standard starting position.
    pub fn new() -> Self {
        Self {
            position: Board::default(),
            records: Vec::new(),
            start: StartPosition::Standard,
        }
    }

    /// Start from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position =
            Board::from_str(fen).map_err(|_| GameError::InvalidFen(fen.to_string()))?;
        Ok(Self {
            position: position.clone(),
            records: Vec::new(),
            start: StartPosition::Custom(position),
        })
    }

    pub fn position(&self) -> &Board {
        &self.position
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn side_to_move(&self) -> PlayerColor {
        self.position.side_to_move().into()
    }

    pub fn to_fen(&self) -> String {
        self.position.to_string()
    }

    /// All legal moves in the current position.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.position.generate_moves(|batch| {
            moves.extend(batch);
            false
        });
        moves
    }

    /// True once the position is terminal.
    pub fn is_over(&self) -> bool {
        self.position.status() != GameStatus::Ongoing
    }

    /// Winner of a decided game (the side that delivered mate).
    pub fn winner(&self) -> Option<PlayerColor> {
        match self.position.status() {
            GameStatus::Won => {
                Some(PlayerColor::from(self.position.side_to_move()).opposite())
            }
            _ => None,
        }
    }

    /// Apply a move given in coordinate notation.
    ///
    /// Accepts castling in both the standard two-square form and the
    /// king-takes-rook form the rules engine plays; the record always holds
    /// the wire form. A promoting move with no promotion letter is filled
    /// in as a queen promotion.
    pub fn apply(&mut self, notation_str: &str, origin: MoveOrigin) -> Result<MoveRecord, GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }

        let parsed = notation::parse_move(notation_str)
            .map_err(|_| GameError::IllegalMove(notation_str.to_string()))?;
        let legal = self.legal_moves();

        let mut mv = notation::to_rules_castling(parsed, &legal);
        if !legal.contains(&mv) {
            // Bare promoting pawn push: fill in the queen.
            let queened = Move {
                promotion: Some(Piece::Queen),
                ..mv
            };
            if mv.promotion.is_none() && legal.contains(&queened) {
                mv = queened;
            } else {
                return Err(GameError::IllegalMove(notation_str.to_string()));
            }
        }

        // The moved piece decides whether this is castling to re-encode for
        // the record.
        let moved = self
            .position
            .piece_on(mv.from)
            .ok_or_else(|| GameError::IllegalMove(notation_str.to_string()))?;
        let wire_notation = notation::format_move(notation::to_wire_castling(mv, moved));

        self.position.play_unchecked(mv);

        let record = MoveRecord {
            notation: wire_notation,
            origin,
            resulting: self.classify_terminal(),
        };
        self.records.push(record.clone());
        Ok(record)
    }

    /// Clear the record and restore the starting position.
    pub fn reset(&mut self) {
        self.position = match &self.start {
            StartPosition::Standard => Board::default(),
            StartPosition::Custom(board) => board.clone(),
        };
        self.records.clear();
    }

    fn classify_terminal(&self) -> Option<TerminalKind> {
        match self.position.status() {
            GameStatus::Ongoing => None,
            GameStatus::Won => Some(TerminalKind::Checkmate),
            // Drawn with moves still available is the fifty-move rule;
            // without, stalemate.
            GameStatus::Drawn => {
                if self.legal_moves().is_empty() {
                    Some(TerminalKind::Stalemate)
                } else {
                    Some(TerminalKind::Draw)
                }
            }
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Game is over")]
    GameOver,
}
