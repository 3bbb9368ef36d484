//! Session layer: one actor task per game session.
//!
//! A session is started with [`start`], which hands back a [`SessionHandle`]
//! for commands and a broadcast receiver for [`SessionEvent`]s. All state
//! lives inside the actor task; the handle only passes messages.
//!
//! [`start_with_connector`] and [`start_with_adapter`] take the transport or
//! engine explicitly instead of building the defaults, which is how the
//! tests drive a session against channel-backed doubles.

mod actor;
mod commands;
mod events;
mod handle;
mod snapshot;
mod state;

use tokio::sync::{broadcast, mpsc};

use arena_engine::{EngineAdapter, EngineConfig};
use arena_protocol::GameMode;

use crate::config::ClientConfig;
use crate::error::{SessionError, SessionResult};
use crate::link::{self, Connector, TcpConnector};

use actor::run_session_actor;
use state::SessionState;

pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use snapshot::SessionView;
pub use state::{SessionStatus, TerminationReason};

const COMMAND_CHANNEL_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Start a session in the given mode.
///
/// Remote sessions connect to `config.authority_addr` over TCP; engine
/// sessions spawn the configured engine binary. Must be called from within
/// a tokio runtime.
pub fn start(
    mode: GameMode,
    config: ClientConfig,
) -> SessionResult<(SessionHandle, broadcast::Receiver<SessionEvent>)> {
    if mode.is_remote() {
        let connector = TcpConnector::new(config.authority_addr.clone());
        return Ok(start_with_connector(mode, config, connector));
    }
    if mode.is_engine() {
        let engine_config = EngineConfig {
            binary: config.engine_binary.clone(),
        };
        let adapter = EngineAdapter::spawn(&engine_config)
            .map_err(|e| SessionError::EngineUnavailable(e.to_string()))?;
        return Ok(start_with_adapter(mode, config, adapter));
    }
    Ok(spawn(SessionState::new(mode, config)))
}

/// Start a remote session over a caller-supplied connector.
pub fn start_with_connector(
    mode: GameMode,
    config: ClientConfig,
    connector: impl Connector,
) -> (SessionHandle, broadcast::Receiver<SessionEvent>) {
    let (link, link_rx) = link::spawn_link(connector);
    spawn(SessionState::with_link(mode, config, link, link_rx))
}

/// Start an engine session over a caller-supplied adapter.
pub fn start_with_adapter(
    mode: GameMode,
    config: ClientConfig,
    adapter: EngineAdapter,
) -> (SessionHandle, broadcast::Receiver<SessionEvent>) {
    spawn(SessionState::with_adapter(mode, config, adapter))
}

fn spawn(state: SessionState) -> (SessionHandle, broadcast::Receiver<SessionEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(run_session_actor(state, cmd_rx, event_tx));
    (SessionHandle::new(cmd_tx), event_rx)
}
