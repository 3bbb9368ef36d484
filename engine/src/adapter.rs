//! The adapter state machine: handshake, one query in flight, suggestion
//! assembly from multipv heads.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::io::{spawn_pump, EngineIo, ProcessIo, PumpEvent};
use crate::uci::{go_command, multipv_command, position_command, EngineReply};
use crate::{EngineConfig, EngineError, EngineEvent, EngineSuggestion, QueryParams};

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Facade over one engine subprocess. Dropping the adapter shuts the
/// engine down.
pub struct EngineAdapter {
    cmd_tx: mpsc::Sender<String>,
    reply_rx: mpsc::Receiver<PumpEvent>,
    pending: Option<PendingQuery>,
    ready: bool,
    variants_set: u8,
}

#[derive(Debug, Default)]
struct PendingQuery {
    /// Candidate heads by 1-based variant index; index 1 is the best line
    /// and already covered by the bestmove reply.
    variants: Vec<(u8, String)>,
}

impl PendingQuery {
    fn record(&mut self, index: u8, notation: String) {
        if index < 2 {
            return;
        }
        match self.variants.iter_mut().find(|(i, _)| *i == index) {
            Some(slot) => slot.1 = notation,
            None => self.variants.push((index, notation)),
        }
    }

    fn into_alternatives(mut self) -> Vec<String> {
        self.variants.sort_by_key(|(i, _)| *i);
        self.variants.into_iter().map(|(_, mv)| mv).collect()
    }
}

impl EngineAdapter {
    /// Spawn the configured engine binary and begin the handshake.
    /// [`EngineEvent::Ready`] arrives on the event stream once the engine
    /// answers.
    pub fn spawn(config: &EngineConfig) -> Result<Self, EngineError> {
        let io = ProcessIo::spawn(config)?;
        Self::start(io)
    }

    /// Same as [`spawn`](Self::spawn) over an injected io implementation.
    pub fn start(io: impl EngineIo) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (reply_tx, reply_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        spawn_pump(io, cmd_rx, reply_tx);

        // Handshake is queued up front; readyok surfaces as Ready later.
        cmd_tx
            .try_send("uci".to_string())
            .and_then(|()| cmd_tx.try_send("isready".to_string()))
            .map_err(|_| EngineError::Closed)?;

        Ok(Self {
            cmd_tx,
            reply_rx,
            pending: None,
            ready: false,
            variants_set: 1,
        })
    }

    /// Ask for a suggestion on `fen`. At most one query may be in flight;
    /// a second submission fails without touching the engine.
    pub async fn submit_position(
        &mut self,
        fen: &str,
        params: QueryParams,
    ) -> Result<(), EngineError> {
        if self.pending.is_some() {
            return Err(EngineError::QueryOutstanding);
        }

        let variants = params.variants.max(1);
        if variants != self.variants_set {
            self.send(multipv_command(variants)).await?;
            self.variants_set = variants;
        }
        self.send(position_command(fen)).await?;
        self.send(go_command(params.depth)).await?;

        self.pending = Some(PendingQuery::default());
        info!(depth = params.depth, variants, "engine query submitted");
        Ok(())
    }

    /// True while a query is unresolved.
    pub fn query_outstanding(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget the outstanding query. A reply that later arrives for it is
    /// discarded silently. Best-effort `stop` so the engine quits searching.
    pub async fn cancel_pending(&mut self) {
        if self.pending.take().is_some() {
            debug!("cancelling outstanding engine query");
            let _ = self.cmd_tx.send("stop".to_string()).await;
        }
    }

    /// Next event from the engine. `None` means the engine is gone and this
    /// adapter is finished.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        while let Some(event) = self.reply_rx.recv().await {
            match event {
                PumpEvent::Reply(EngineReply::UciOk) => {
                    debug!("engine identified");
                }
                PumpEvent::Reply(EngineReply::ReadyOk) => {
                    if !self.ready {
                        self.ready = true;
                        return Some(EngineEvent::Ready);
                    }
                }
                PumpEvent::Reply(EngineReply::VariantHead { index, notation }) => {
                    if let Some(pending) = self.pending.as_mut() {
                        pending.record(index, notation);
                    }
                }
                PumpEvent::Reply(EngineReply::BestMove(mv)) => {
                    let Some(pending) = self.pending.take() else {
                        debug!("discarding engine reply with no query outstanding");
                        continue;
                    };
                    return Some(match mv {
                        Some(best) => EngineEvent::Suggestion(EngineSuggestion {
                            best,
                            alternatives: pending.into_alternatives(),
                        }),
                        None => EngineEvent::NoMove,
                    });
                }
                PumpEvent::Malformed(line) => {
                    self.pending = None;
                    return Some(EngineEvent::Fault(format!("malformed reply: {line}")));
                }
                PumpEvent::Closed { detail } => {
                    warn!(?detail, "engine connection lost");
                    self.pending = None;
                    return Some(EngineEvent::Fault(
                        detail.unwrap_or_else(|| "engine closed".to_string()),
                    ));
                }
            }
        }
        None
    }

    async fn send(&mut self, line: String) -> Result<(), EngineError> {
        self.cmd_tx.send(line).await.map_err(|_| EngineError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{mock_engine, EngineProbe};
    use tokio_test::assert_ok;

    async fn ready_adapter() -> (EngineAdapter, EngineProbe) {
        let (io, probe) = mock_engine();
        probe.feed_handshake();
        let mut adapter = EngineAdapter::start(io).unwrap();
        assert_eq!(adapter.next_event().await, Some(EngineEvent::Ready));
        (adapter, probe)
    }

    #[tokio::test]
    async fn test_handshake_single_ready() {
        let (mut adapter, mut probe) = ready_adapter().await;
        // A stray second readyok must not produce a second Ready.
        probe.feed_line("readyok");
        probe.feed_line("bestmove e2e4");

        adapter
            .submit_position("fen-here", QueryParams::default())
            .await
            .unwrap();
        assert_eq!(
            adapter.next_event().await,
            Some(EngineEvent::Suggestion(EngineSuggestion {
                best: "e2e4".into(),
                alternatives: vec![],
            }))
        );

        assert_eq!(probe.next_sent().await.as_deref(), Some("uci"));
        assert_eq!(probe.next_sent().await.as_deref(), Some("isready"));
        assert_eq!(
            probe.next_sent().await.as_deref(),
            Some("position fen fen-here")
        );
        assert_eq!(probe.next_sent().await.as_deref(), Some("go depth 2"));
    }

    #[tokio::test]
    async fn test_single_outstanding_query() {
        let (mut adapter, _probe) = ready_adapter().await;

        adapter
            .submit_position("first", QueryParams::default())
            .await
            .unwrap();
        assert!(adapter.query_outstanding());
        let second = adapter
            .submit_position("second", QueryParams::default())
            .await;
        assert!(matches!(second, Err(EngineError::QueryOutstanding)));
    }

    #[tokio::test]
    async fn test_resolution_reopens_query_slot() {
        let (mut adapter, probe) = ready_adapter().await;
        probe.feed_line("bestmove d2d4");

        adapter
            .submit_position("p1", QueryParams::default())
            .await
            .unwrap();
        assert!(matches!(
            adapter.next_event().await,
            Some(EngineEvent::Suggestion(_))
        ));
        assert!(!adapter.query_outstanding());
        tokio_test::assert_ok!(adapter.submit_position("p2", QueryParams::default()).await);
    }

    #[tokio::test]
    async fn test_no_move_reply() {
        let (mut adapter, probe) = ready_adapter().await;
        probe.feed_line("bestmove (none)");

        adapter
            .submit_position("mated", QueryParams::default())
            .await
            .unwrap();
        assert_eq!(adapter.next_event().await, Some(EngineEvent::NoMove));
    }

    #[tokio::test]
    async fn test_alternatives_from_variant_heads() {
        let (mut adapter, mut probe) = ready_adapter().await;
        probe.feed_line("info depth 8 multipv 1 score cp 30 pv e2e4 e7e5");
        probe.feed_line("info depth 8 multipv 2 score cp 22 pv d2d4 d7d5");
        probe.feed_line("info depth 8 multipv 3 score cp 15 pv g1f3");
        probe.feed_line("bestmove e2e4");

        adapter
            .submit_position(
                "startfen",
                QueryParams {
                    depth: 8,
                    variants: 3,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            adapter.next_event().await,
            Some(EngineEvent::Suggestion(EngineSuggestion {
                best: "e2e4".into(),
                alternatives: vec!["d2d4".into(), "g1f3".into()],
            }))
        );
        probe.expect_sent("setoption name MultiPV value 3").await;
    }

    #[tokio::test]
    async fn test_cancel_discards_late_reply() {
        let (mut adapter, mut probe) = ready_adapter().await;

        adapter
            .submit_position("p", QueryParams::default())
            .await
            .unwrap();
        adapter.cancel_pending().await;
        assert!(!adapter.query_outstanding());
        probe.expect_sent("stop").await;

        // The bestmove for the cancelled query must be swallowed, along
        // with any stray readyok; the stream then just blocks.
        probe.feed_line("bestmove e7e5");
        probe.feed_line("readyok");
        let next = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            adapter.next_event(),
        )
        .await;
        assert!(next.is_err(), "stale reply leaked: {next:?}");
    }

    #[tokio::test]
    async fn test_engine_loss_fault_then_end() {
        let (mut adapter, mut probe) = ready_adapter().await;
        probe.hang_up();

        assert!(matches!(
            adapter.next_event().await,
            Some(EngineEvent::Fault(_))
        ));
        assert_eq!(adapter.next_event().await, None);
    }
}
