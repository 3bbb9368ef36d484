//! Runtime configuration for the arena client.
//!
//! Centralises the session-layer tunables: authority address, engine binary
//! override, search depths, matchmaking timeout, and fault budgets. Every
//! value has a compile-time default; the deployment-dependent ones can be
//! overridden via dedicated environment variables.

use std::path::PathBuf;
use std::time::Duration;

use arena_protocol::{ColorPreference, GameMode};

/// Default authority address for remote sessions.
const DEFAULT_AUTHORITY_ADDR: &str = "127.0.0.1:9090";

/// Default search depth for easy engine sessions.
const DEFAULT_EASY_DEPTH: u8 = 2;

/// Default search depth for hard engine sessions.
const DEFAULT_HARD_DEPTH: u8 = 12;

/// Default number of variants requested per engine query.
const DEFAULT_VARIANT_COUNT: u8 = 1;

/// Consecutive undecodable frames tolerated before the link is declared dead.
const DEFAULT_MAX_DECODE_FAULTS: u32 = 3;

/// Consecutive engine faults tolerated before the session is terminated.
const DEFAULT_MAX_ENGINE_FAULTS: u32 = 2;

/// Runtime tunables for a session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Authority `host:port` for remote sessions.
    pub authority_addr: String,
    /// Side preference sent with `session_init`.
    pub color_preference: ColorPreference,
    /// Explicit engine binary. `None` probes well-known locations.
    pub engine_binary: Option<PathBuf>,
    /// Search depth for `VersusEngineEasy`.
    pub easy_depth: u8,
    /// Search depth for `VersusEngineHard`.
    pub hard_depth: u8,
    /// Variants requested per engine query (MultiPV).
    pub variant_count: u8,
    /// How long to wait in matchmaking before giving up. `None` waits
    /// indefinitely.
    pub matchmaking_timeout: Option<Duration>,
    /// Decode-fault budget for the authority link.
    pub max_decode_faults: u32,
    /// Fault budget for the engine adapter.
    pub max_engine_faults: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            authority_addr: DEFAULT_AUTHORITY_ADDR.to_string(),
            color_preference: ColorPreference::default(),
            engine_binary: None,
            easy_depth: DEFAULT_EASY_DEPTH,
            hard_depth: DEFAULT_HARD_DEPTH,
            variant_count: DEFAULT_VARIANT_COUNT,
            matchmaking_timeout: None,
            max_decode_faults: DEFAULT_MAX_DECODE_FAULTS,
            max_engine_faults: DEFAULT_MAX_ENGINE_FAULTS,
        }
    }
}

impl ClientConfig {
    /// Build a config from defaults plus environment overrides.
    ///
    /// Priority per field:
    /// 1. dedicated `ARENA_*` env variable if set (unparseable numeric
    ///    values fall back to the default)
    /// 2. compile-time default
    ///
    /// Recognised variables: `ARENA_AUTHORITY_ADDR`, `ARENA_ENGINE_PATH`,
    /// `ARENA_EASY_DEPTH`, `ARENA_HARD_DEPTH`,
    /// `ARENA_MATCHMAKING_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("ARENA_AUTHORITY_ADDR") {
            config.authority_addr = addr;
        }
        if let Ok(path) = std::env::var("ARENA_ENGINE_PATH") {
            config.engine_binary = Some(PathBuf::from(path));
        }
        if let Ok(depth) = std::env::var("ARENA_EASY_DEPTH") {
            config.easy_depth = depth.parse().unwrap_or(DEFAULT_EASY_DEPTH);
        }
        if let Ok(depth) = std::env::var("ARENA_HARD_DEPTH") {
            config.hard_depth = depth.parse().unwrap_or(DEFAULT_HARD_DEPTH);
        }
        if let Ok(secs) = std::env::var("ARENA_MATCHMAKING_TIMEOUT_SECS") {
            config.matchmaking_timeout = secs.parse().ok().map(Duration::from_secs);
        }

        config
    }

    /// Search depth to use for an engine-backed mode.
    pub fn depth_for(&self, mode: GameMode) -> u8 {
        match mode {
            GameMode::VersusEngineHard => self.hard_depth,
            _ => self.easy_depth,
        }
    }
}
