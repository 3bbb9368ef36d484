//! Session vocabulary shared across the protocol, client, and engine crates.
//! cozy-chess types stay an implementation detail of the rules layer.

use serde::{Deserialize, Serialize};

/// How a session is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    LocalPassAndPlay,
    VersusRemotePlayer,
    VersusEngineEasy,
    VersusEngineHard,
}

impl GameMode {
    /// Remote sessions run over the authority link.
    pub fn is_remote(self) -> bool {
        matches!(self, Self::VersusRemotePlayer)
    }

    /// Engine sessions run against the local move-suggestion adapter.
    pub fn is_engine(self) -> bool {
        matches!(self, Self::VersusEngineEasy | Self::VersusEngineHard)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LocalPassAndPlay => "local_pass_and_play",
            Self::VersusRemotePlayer => "versus_remote_player",
            Self::VersusEngineEasy => "versus_engine_easy",
            Self::VersusEngineHard => "versus_engine_hard",
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Side assignment for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl From<cozy_chess::Color> for PlayerColor {
    fn from(c: cozy_chess::Color) -> Self {
        match c {
            cozy_chess::Color::White => Self::White,
            cozy_chess::Color::Black => Self::Black,
        }
    }
}

impl From<PlayerColor> for cozy_chess::Color {
    fn from(c: PlayerColor) -> Self {
        match c {
            PlayerColor::White => Self::White,
            PlayerColor::Black => Self::Black,
        }
    }
}

impl std::fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Side the user would like to play, sent with `session_init`. The authority
/// may override it when both queued players ask for the same side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPreference {
    White,
    Black,
    #[default]
    Either,
}

/// Final result reported in a `termination_notice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameOutcome {
    pub fn win_for(color: PlayerColor) -> Self {
        match color {
            PlayerColor::White => Self::WhiteWins,
            PlayerColor::Black => Self::BlackWins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_classification() {
        assert!(GameMode::VersusRemotePlayer.is_remote());
        assert!(!GameMode::VersusRemotePlayer.is_engine());
        assert!(GameMode::VersusEngineEasy.is_engine());
        assert!(GameMode::VersusEngineHard.is_engine());
        assert!(!GameMode::LocalPassAndPlay.is_remote());
        assert!(!GameMode::LocalPassAndPlay.is_engine());
    }

    #[test]
    fn test_color_conversion_round_trip() {
        for color in [PlayerColor::White, PlayerColor::Black] {
            let cozy: cozy_chess::Color = color.into();
            assert_eq!(PlayerColor::from(cozy), color);
        }
    }

    #[test]
    fn test_opposite_flips() {
        assert_eq!(PlayerColor::White.opposite(), PlayerColor::Black);
        assert_eq!(PlayerColor::Black.opposite(), PlayerColor::White);
    }
}
