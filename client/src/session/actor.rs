//! The session actor: one task owning all session state.
//!
//! Commands from handles, frames from the authority link, and events from
//! the engine adapter are processed strictly sequentially, so no transition
//! ever races another.

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

use arena_engine::{EngineAdapter, EngineEvent, EngineSuggestion};
use arena_protocol::{
    codec, notation, ClientMessage, ColorPreference, GameMode, GameOutcome, PlayerColor,
    ServerMessage,
};

use crate::error::SessionError;
use crate::game::{GameState, MoveOrigin, MoveRecord, TerminalKind};
use crate::link::LinkEvent;

use super::commands::SessionCommand;
use super::events::SessionEvent;
use super::snapshot::SessionView;
use super::state::{SessionState, SessionStatus, TerminationReason};

/// Run a session to completion. Exits once every handle is dropped; the
/// link and the engine are torn down on the way out.
pub(crate) async fn run_session_actor(
    state: SessionState,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    let span = tracing::info_span!("session", mode = %state.mode);
    run_session_actor_inner(state, cmd_rx, event_tx)
        .instrument(span)
        .await;
}

async fn run_session_actor_inner(
    mut state: SessionState,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    info!("session actor started");
    startup(&mut state, &event_tx);

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => handle_command(&mut state, cmd, &event_tx).await,
                    None => {
                        info!("all handles dropped, session actor shutting down");
                        break;
                    }
                }
            }

            Some(event) = next_link_event(&mut state.link_rx) => {
                handle_link_event(&mut state, event, &event_tx).await;
            }

            Some(event) = next_engine_event(&mut state.engine) => {
                handle_engine_event(&mut state, event, &event_tx).await;
            }

            _ = matchmaking_deadline(state.deadline) => {
                handle_matchmaking_timeout(&mut state, &event_tx).await;
            }
        }
    }

    info!("session actor exited");
}

/// Resolve the next link event, or park forever when there is no link.
/// Borrows only the receiver so the select arms stay disjoint.
async fn next_link_event(link_rx: &mut Option<mpsc::Receiver<LinkEvent>>) -> Option<LinkEvent> {
    match link_rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_engine_event(engine: &mut Option<EngineAdapter>) -> Option<EngineEvent> {
    match engine {
        Some(adapter) => adapter.next_event().await,
        None => std::future::pending().await,
    }
}

async fn matchmaking_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// First transition out of `Menu`. Local sessions are playable straight
/// away; everything else waits for its backend to come up.
fn startup(state: &mut SessionState, event_tx: &broadcast::Sender<SessionEvent>) {
    if state.mode == GameMode::LocalPassAndPlay {
        state.status = SessionStatus::Active;
        info!("local session active");
    } else {
        state.status = SessionStatus::Connecting;
    }
    emit_state(state, event_tx);
}

fn emit_state(state: &SessionState, event_tx: &broadcast::Sender<SessionEvent>) {
    let _ = event_tx.send(SessionEvent::StateChanged(state.view()));
}

fn emit_notice(event_tx: &broadcast::Sender<SessionEvent>, text: impl Into<String>) {
    let _ = event_tx.send(SessionEvent::Notice(text.into()));
}

async fn handle_command(
    state: &mut SessionState,
    cmd: SessionCommand,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match cmd {
        SessionCommand::SubmitMove { notation, reply } => {
            let result = submit_move(state, &notation).await;
            let accepted = result.is_ok();
            if accepted {
                emit_state(state, event_tx);
            }
            let _ = reply.send(result);
            if accepted {
                maybe_query_engine(state, event_tx).await;
            }
        }
        SessionCommand::RequestReset { reply } => {
            let result = request_reset(state, event_tx).await;
            let _ = reply.send(result);
        }
        SessionCommand::Cancel { reply } => {
            cancel(state, event_tx).await;
            let _ = reply.send(Ok(()));
        }
        SessionCommand::GetView { reply } => {
            let _ = reply.send(state.view());
        }
        SessionCommand::Subscribe { reply } => {
            let _ = reply.send((state.view(), event_tx.subscribe()));
        }
    }
}

/// Validate and apply a local move. The returned view already reflects the
/// move and any termination it caused.
async fn submit_move(
    state: &mut SessionState,
    notation_str: &str,
) -> Result<SessionView, SessionError> {
    if state.status != SessionStatus::Active {
        return Err(SessionError::NotActive);
    }
    if let Some(color) = state.local_color {
        if state.game.side_to_move() != color {
            return Err(SessionError::NotYourTurn);
        }
    }

    let record = state.game.apply(notation_str, MoveOrigin::LocalInput)?;
    info!(notation = %record.notation, "local move applied");

    if state.mode.is_remote() {
        send_move_frame(state, &record).await;
    }
    if let Some(kind) = record.resulting {
        finish_for_terminal(state, kind, true).await;
    }

    Ok(state.view())
}

async fn request_reset(
    state: &mut SessionState,
    event_tx: &broadcast::Sender<SessionEvent>,
) -> Result<(), SessionError> {
    if state.status != SessionStatus::Active {
        return Err(SessionError::NotActive);
    }

    if state.mode.is_remote() {
        let Some(session_id) = state.session_id.clone() else {
            return Err(SessionError::Internal("Active session without an id".into()));
        };
        send_frame(state, &ClientMessage::ResetRequest { session_id }).await;
        emit_notice(event_tx, "Reset requested, waiting for the authority");
        return Ok(());
    }

    state.game.reset();
    if let Some(engine) = state.engine.as_mut() {
        engine.cancel_pending().await;
    }
    info!("game reset to the initial position");
    emit_state(state, event_tx);
    maybe_query_engine(state, event_tx).await;
    Ok(())
}

/// Abandon the session. Cancelling a terminated session is a no-op, so
/// this never fails.
async fn cancel(state: &mut SessionState, event_tx: &broadcast::Sender<SessionEvent>) {
    match state.status.clone() {
        SessionStatus::Terminated(_) => {}
        SessionStatus::Active => {
            if state.mode.is_remote() {
                if let Some(session_id) = state.session_id.clone() {
                    send_frame(state, &ClientMessage::Forfeit { session_id }).await;
                }
            }
            state.terminate(TerminationReason::Resignation);
            emit_state(state, event_tx);
        }
        SessionStatus::WaitingForOpponent { pending } => {
            send_frame(state, &ClientMessage::Cancel { session_id: pending }).await;
            state.terminate(TerminationReason::Cancelled);
            emit_state(state, event_tx);
        }
        SessionStatus::Menu | SessionStatus::Connecting => {
            if state.mode.is_remote() {
                send_frame(state, &ClientMessage::Cancel { session_id: None }).await;
            }
            state.terminate(TerminationReason::Cancelled);
            emit_state(state, event_tx);
        }
    }
}

async fn handle_link_event(
    state: &mut SessionState,
    event: LinkEvent,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match event {
        LinkEvent::Established => {
            if state.status.is_terminated() {
                return;
            }
            info!("authority link established");
            let init = ClientMessage::SessionInit {
                mode: state.mode,
                color_preference: state.config.color_preference,
            };
            send_frame(state, &init).await;
            state.status = SessionStatus::WaitingForOpponent { pending: None };
            state.deadline = state
                .config
                .matchmaking_timeout
                .map(|timeout| Instant::now() + timeout);
            emit_state(state, event_tx);
        }
        LinkEvent::Frame(frame) => {
            handle_frame(state, &frame, event_tx).await;
        }
        LinkEvent::Closed { clean, detail } => {
            // Last event the link ever emits.
            state.link_rx = None;
            state.link = None;
            if state.status.is_terminated() {
                return;
            }
            warn!(clean, ?detail, "authority link closed under us");
            if let Some(detail) = detail {
                emit_notice(event_tx, format!("Connection lost: {detail}"));
            }
            let reason = if state.status == SessionStatus::Active {
                TerminationReason::OpponentDisconnected
            } else {
                TerminationReason::Error
            };
            state.terminate(reason);
            emit_state(state, event_tx);
        }
    }
}

async fn handle_frame(
    state: &mut SessionState,
    frame: &str,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    if state.status.is_terminated() {
        debug!("frame after termination discarded");
        return;
    }
    let message = match codec::decode(frame) {
        Ok(message) => message,
        Err(e) => {
            warn!("undecodable frame: {e}");
            emit_notice(event_tx, format!("Undecodable frame from authority: {e}"));
            if state.note_decode_fault() {
                emit_notice(event_tx, "Authority link is unusable, giving up");
                state.terminate(TerminationReason::Error);
                emit_state(state, event_tx);
            }
            return;
        }
    };
    // Authority complaints count against the same budget as garbage, so a
    // complaint loop cannot keep a dead session alive.
    if !matches!(message, ServerMessage::ProtocolError { .. }) {
        state.decode_faults = 0;
    }
    handle_server_message(state, message, event_tx).await;
}

async fn handle_server_message(
    state: &mut SessionState,
    message: ServerMessage,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match message {
        ServerMessage::SessionPending { session_id } => {
            if let SessionStatus::WaitingForOpponent { pending } = &mut state.status {
                info!(%session_id, "queued for matchmaking");
                *pending = Some(session_id);
                emit_state(state, event_tx);
            } else {
                debug!(%session_id, "session_pending outside matchmaking ignored");
            }
        }
        ServerMessage::SessionStart {
            session_id,
            assigned_color,
            start_position,
        } => {
            start_session(state, session_id, assigned_color, start_position, event_tx);
        }
        ServerMessage::Move {
            session_id,
            notation: plain,
            promotion,
        } => {
            if state.session_id.as_deref() != Some(session_id.as_str()) {
                warn!(%session_id, "move for a different session dropped");
                return;
            }
            let fused = notation::fuse_promotion(&plain, promotion);
            apply_inbound_move(state, &fused, MoveOrigin::RemotePeer, event_tx).await;
        }
        ServerMessage::SessionStatus { status, .. } => {
            info!(%status, "authority status");
            emit_notice(event_tx, status);
        }
        ServerMessage::OpponentLeft { session_id } => {
            if !state.owns_session_id(&session_id) {
                debug!(%session_id, "opponent_left for a different session dropped");
                return;
            }
            info!("opponent left the session");
            state.terminate(TerminationReason::OpponentDisconnected);
            emit_state(state, event_tx);
        }
        ServerMessage::ProtocolError {
            session_id,
            message,
        } => {
            warn!(?session_id, %message, "authority protocol error");
            match session_id {
                Some(id) if state.owns_session_id(&id) => {
                    emit_notice(event_tx, format!("Authority rejected the session: {message}"));
                    state.terminate(TerminationReason::Error);
                    emit_state(state, event_tx);
                }
                _ => {
                    emit_notice(event_tx, format!("Authority protocol error: {message}"));
                    if state.note_decode_fault() {
                        emit_notice(event_tx, "Authority link is unusable, giving up");
                        state.terminate(TerminationReason::Error);
                        emit_state(state, event_tx);
                    }
                }
            }
        }
    }
}

/// Pairing complete: adopt the assigned id and color and go active.
fn start_session(
    state: &mut SessionState,
    session_id: String,
    assigned_color: PlayerColor,
    start_position: Option<String>,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    if !matches!(state.status, SessionStatus::WaitingForOpponent { .. }) {
        // Duplicate delivery, or a start that lost the race with a cancel.
        debug!(%session_id, "session_start outside matchmaking ignored");
        return;
    }
    if let Some(fen) = &start_position {
        match GameState::from_fen(fen) {
            Ok(game) => state.game = game,
            Err(e) => {
                error!("authority sent an unusable start position: {e}");
                emit_notice(event_tx, format!("Unusable start position: {e}"));
                state.terminate(TerminationReason::Error);
                emit_state(state, event_tx);
                return;
            }
        }
    }
    info!(%session_id, color = %assigned_color, "session started");
    state.session_id = Some(session_id);
    state.local_color = Some(assigned_color);
    state.status = SessionStatus::Active;
    state.deadline = None;
    emit_state(state, event_tx);
}

/// Apply a move that did not come from local input: the remote peer's or
/// the engine's. A move that is illegal in our position means the two ends
/// no longer agree on the game; the position is left untouched and the
/// session ends.
async fn apply_inbound_move(
    state: &mut SessionState,
    fused: &str,
    origin: MoveOrigin,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    if state.status != SessionStatus::Active {
        debug!(notation = %fused, "inbound move outside an active game dropped");
        return;
    }
    match state.game.apply(fused, origin) {
        Ok(record) => {
            info!(notation = %record.notation, ?origin, "inbound move applied");
            if origin == MoveOrigin::EngineAdapter {
                state.engine_faults = 0;
            }
            if let Some(kind) = record.resulting {
                finish_for_terminal(state, kind, false).await;
            }
            emit_state(state, event_tx);
            maybe_query_engine(state, event_tx).await;
        }
        Err(e) => {
            error!(notation = %fused, ?origin, "inbound move is illegal here: {e}");
            emit_notice(event_tx, format!("Session desynchronized on move {fused}"));
            state.terminate(TerminationReason::Error);
            emit_state(state, event_tx);
        }
    }
}

async fn handle_engine_event(
    state: &mut SessionState,
    event: EngineEvent,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match event {
        EngineEvent::Ready => {
            if state.status != SessionStatus::Connecting {
                debug!("stray engine ready ignored");
                return;
            }
            activate_engine_session(state, event_tx).await;
        }
        EngineEvent::Suggestion(suggestion) => {
            apply_suggestion(state, suggestion, event_tx).await;
        }
        EngineEvent::NoMove => {
            handle_engine_fault(state, "Engine returned no move".into(), event_tx).await;
        }
        EngineEvent::Fault(detail) => {
            handle_engine_fault(state, format!("Engine fault: {detail}"), event_tx).await;
        }
    }
}

/// Handshake done. The engine plays the side the user did not ask for.
async fn activate_engine_session(
    state: &mut SessionState,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    let local = match state.config.color_preference {
        ColorPreference::Black => PlayerColor::Black,
        ColorPreference::White | ColorPreference::Either => PlayerColor::White,
    };
    state.local_color = Some(local);
    state.status = SessionStatus::Active;
    info!(color = %local, "engine session active");
    emit_state(state, event_tx);
    maybe_query_engine(state, event_tx).await;
}

async fn apply_suggestion(
    state: &mut SessionState,
    suggestion: EngineSuggestion,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    if !suggestion.alternatives.is_empty() {
        debug!(alternatives = ?suggestion.alternatives, "engine offered alternatives");
    }
    apply_inbound_move(state, &suggestion.best, MoveOrigin::EngineAdapter, event_tx).await;
}

/// Count one engine failure, retry while budget remains, terminate once it
/// runs out.
async fn handle_engine_fault(
    state: &mut SessionState,
    detail: String,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    state.engine_faults += 1;
    warn!(faults = state.engine_faults, "{detail}");
    emit_notice(event_tx, detail);
    if state.engine_faults >= state.config.max_engine_faults {
        emit_notice(event_tx, "Engine is unusable, ending the session");
        state.terminate(TerminationReason::Error);
        emit_state(state, event_tx);
        return;
    }
    maybe_query_engine(state, event_tx).await;
}

/// Query the engine whenever it owns the side to move. Submission failures
/// burn the same fault budget as bad replies.
async fn maybe_query_engine(state: &mut SessionState, event_tx: &broadcast::Sender<SessionEvent>) {
    loop {
        if !state.engine_should_move() {
            return;
        }
        match state.query_engine().await {
            Ok(()) => return,
            Err(e) => {
                state.engine_faults += 1;
                warn!(faults = state.engine_faults, "engine query failed: {e}");
                emit_notice(event_tx, format!("Engine query failed: {e}"));
                if state.engine_faults >= state.config.max_engine_faults {
                    emit_notice(event_tx, "Engine is unusable, ending the session");
                    state.terminate(TerminationReason::Error);
                    emit_state(state, event_tx);
                    return;
                }
            }
        }
    }
}

async fn handle_matchmaking_timeout(
    state: &mut SessionState,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    state.deadline = None;
    let SessionStatus::WaitingForOpponent { pending } = state.status.clone() else {
        return;
    };
    info!("matchmaking timed out");
    emit_notice(event_tx, "No opponent found in time");
    send_frame(state, &ClientMessage::Cancel { session_id: pending }).await;
    state.terminate(TerminationReason::Cancelled);
    emit_state(state, event_tx);
}

fn termination_for(state: &SessionState, kind: TerminalKind) -> TerminationReason {
    match kind {
        // The side left to move is the one that got mated.
        TerminalKind::Checkmate => TerminationReason::Checkmate {
            winner: state.game.side_to_move().opposite(),
        },
        TerminalKind::Stalemate => TerminationReason::Stalemate,
        TerminalKind::Draw => TerminationReason::Draw,
    }
}

/// The position just became terminal. Announce it to the authority when the
/// local side produced it, then terminate. Queued frames drain before the
/// link closes.
async fn finish_for_terminal(state: &mut SessionState, kind: TerminalKind, announce: bool) {
    let reason = termination_for(state, kind);
    if announce && state.mode.is_remote() {
        if let Some(session_id) = state.session_id.clone() {
            let outcome = match &reason {
                TerminationReason::Checkmate { winner } => GameOutcome::win_for(*winner),
                _ => GameOutcome::Draw,
            };
            let notice = ClientMessage::TerminationNotice {
                session_id,
                outcome,
                reason: reason.to_string(),
            };
            send_frame(state, &notice).await;
        }
    }
    state.terminate(reason);
}

async fn send_move_frame(state: &mut SessionState, record: &MoveRecord) {
    let Some(session_id) = state.session_id.clone() else {
        return;
    };
    let (plain, promotion) = notation::split_promotion(&record.notation);
    let message = ClientMessage::Move {
        session_id,
        notation: plain.to_string(),
        promotion,
    };
    send_frame(state, &message).await;
}

/// Best-effort frame send. Encode failures are programming errors and are
/// logged rather than allowed to kill the actor.
async fn send_frame(state: &mut SessionState, message: &ClientMessage) {
    let Some(link) = &state.link else {
        return;
    };
    match codec::encode(message) {
        Ok(frame) => {
            if link.send(frame).await.is_err() {
                warn!("authority link gone while sending a frame");
            }
        }
        Err(e) => error!("failed to encode outbound message: {e}"),
    }
}
