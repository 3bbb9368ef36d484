//! Stateless frame codec. One JSON object per line; framing (the trailing
//! newline) belongs to the transport.

use crate::{ClientMessage, ProtocolError, ServerMessage};

/// Upper bound on a single frame. Anything larger is rejected before the
/// JSON parser sees it.
pub const MAX_FRAME_LEN: usize = 8 * 1024;

/// Encode an outbound message as a single-line JSON frame.
pub fn encode(msg: &ClientMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decode one inbound frame. Rejects empty, oversized, and malformed input
/// with a diagnostic error; never panics.
pub fn decode(frame: &str) -> Result<ServerMessage, ProtocolError> {
    let frame = frame.trim();
    if frame.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }
    if frame.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::OversizedFrame(frame.len()));
    }

    serde_json::from_str(frame).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorPreference, GameMode, GameOutcome, PlayerColor};

    #[test]
    fn test_encode_every_outbound_kind() {
        let messages = [
            ClientMessage::SessionInit {
                mode: GameMode::VersusRemotePlayer,
                color_preference: ColorPreference::Black,
            },
            ClientMessage::Move {
                session_id: "g1".into(),
                notation: "e2e4".into(),
                promotion: None,
            },
            ClientMessage::TerminationNotice {
                session_id: "g1".into(),
                outcome: GameOutcome::WhiteWins,
                reason: "checkmate".into(),
            },
            ClientMessage::Forfeit {
                session_id: "g1".into(),
            },
            ClientMessage::Cancel { session_id: None },
            ClientMessage::ResetRequest {
                session_id: "g1".into(),
            },
        ];
        let expected_kinds = [
            "session_init",
            "move",
            "termination_notice",
            "forfeit",
            "cancel",
            "reset_request",
        ];

        for (msg, kind) in messages.iter().zip(expected_kinds) {
            let frame = encode(msg).unwrap();
            assert!(
                frame.contains(&format!(r#""kind":"{kind}""#)),
                "frame {frame} missing kind {kind}"
            );
            assert!(!frame.contains('\n'), "frames are single-line");
        }
    }

    #[test]
    fn test_decode_every_inbound_kind() {
        let pending = decode(r#"{"kind":"session_pending","session_id":"g1"}"#).unwrap();
        assert_eq!(
            pending,
            ServerMessage::SessionPending {
                session_id: "g1".into()
            }
        );

        let start =
            decode(r#"{"kind":"session_start","session_id":"g1","assigned_color":"black"}"#)
                .unwrap();
        assert_eq!(
            start,
            ServerMessage::SessionStart {
                session_id: "g1".into(),
                assigned_color: PlayerColor::Black,
                start_position: None,
            }
        );

        let mv =
            decode(r#"{"kind":"move","session_id":"g1","notation":"e7e8","promotion":"q"}"#)
                .unwrap();
        assert_eq!(
            mv,
            ServerMessage::Move {
                session_id: "g1".into(),
                notation: "e7e8".into(),
                promotion: Some('q'),
            }
        );

        let status = decode(r#"{"kind":"session_status","status":"searching for opponent"}"#)
            .unwrap();
        assert_eq!(
            status,
            ServerMessage::SessionStatus {
                session_id: None,
                status: "searching for opponent".into(),
            }
        );

        let left = decode(r#"{"kind":"opponent_left","session_id":"g1"}"#).unwrap();
        assert_eq!(
            left,
            ServerMessage::OpponentLeft {
                session_id: "g1".into()
            }
        );

        let fault =
            decode(r#"{"kind":"protocol_error","message":"unknown session"}"#).unwrap();
        assert_eq!(
            fault,
            ServerMessage::ProtocolError {
                session_id: None,
                message: "unknown session".into(),
            }
        );
    }

    #[test]
    fn test_move_relays_as_inbound_shape() {
        // The authority relays moves verbatim, so the two move payloads
        // must agree field-for-field.
        let out = ClientMessage::Move {
            session_id: "g1".into(),
            notation: "e7e8".into(),
            promotion: Some('q'),
        };
        let frame = encode(&out).unwrap();
        let back = decode(&frame).unwrap();
        assert_eq!(
            back,
            ServerMessage::Move {
                session_id: "g1".into(),
                notation: "e7e8".into(),
                promotion: Some('q'),
            }
        );
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        assert_eq!(decode(""), Err(ProtocolError::EmptyFrame));
        assert_eq!(decode("   \n"), Err(ProtocolError::EmptyFrame));
        assert!(matches!(
            decode("not json at all"),
            Err(ProtocolError::MalformedFrame(_))
        ));
        assert!(matches!(
            decode(r#"{"kind":"warp_drive"}"#),
            Err(ProtocolError::MalformedFrame(_))
        ));
        assert!(matches!(
            decode(r#"{"kind":"move","session_id":"g1"}"#),
            Err(ProtocolError::MalformedFrame(_))
        ));

        let oversized = format!(
            r#"{{"kind":"session_status","status":"{}"}}"#,
            "x".repeat(MAX_FRAME_LEN)
        );
        assert!(matches!(
            decode(&oversized),
            Err(ProtocolError::OversizedFrame(_))
        ));
    }

    #[test]
    fn test_decode_trims_whitespace() {
        let msg = decode("  {\"kind\":\"session_pending\",\"session_id\":\"g1\"}\r\n").unwrap();
        assert_eq!(
            msg,
            ServerMessage::SessionPending {
                session_id: "g1".into()
            }
        );
    }
}
