//! The slice of UCI this adapter speaks.
//!
//! Only four reply shapes matter here: `uciok`, `readyok`, `bestmove`
//! (including the explicit `(none)` form), and the multipv head of `info`
//! lines when alternatives were requested. Everything else an engine prints
//! is ignored line by line.

use arena_protocol::notation;

use crate::EngineError;

/// Replies the adapter reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineReply {
    UciOk,
    ReadyOk,
    /// `None` is the engine's explicit no-move answer (`bestmove (none)`).
    BestMove(Option<String>),
    /// First move of one candidate line, 1-based variant index.
    VariantHead { index: u8, notation: String },
}

/// Parse one line of engine output. `Ok(None)` means the line is valid UCI
/// chatter we do not react to.
pub fn parse_engine_line(line: &str) -> Result<Option<EngineReply>, EngineError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(Some(EngineReply::UciOk)),
        Some(&"readyok") => Ok(Some(EngineReply::ReadyOk)),

        Some(&"bestmove") => {
            let Some(&token) = tokens.get(1) else {
                return Err(EngineError::MalformedReply(line.to_string()));
            };
            if token == "(none)" || token == "0000" {
                return Ok(Some(EngineReply::BestMove(None)));
            }
            notation::parse_move(token)
                .map_err(|_| EngineError::MalformedReply(line.to_string()))?;
            Ok(Some(EngineReply::BestMove(Some(token.to_string()))))
        }

        Some(&"info") => Ok(parse_variant_head(&tokens[1..])),

        _ => Ok(None),
    }
}

/// Extract `multipv <k> ... pv <move>` from an info line, when both are
/// present and the move parses.
fn parse_variant_head(tokens: &[&str]) -> Option<EngineReply> {
    let mut index: Option<u8> = None;
    let mut head: Option<String> = None;

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "multipv" => {
                i += 1;
                index = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "pv" => {
                i += 1;
                head = tokens
                    .get(i)
                    .filter(|s| notation::parse_move(s).is_ok())
                    .map(|s| s.to_string());
            }
            _ => {}
        }
        i += 1;
    }

    Some(EngineReply::VariantHead {
        index: index?,
        notation: head?,
    })
}

/// `position fen ...` command for a query.
pub fn position_command(fen: &str) -> String {
    format!("position fen {fen}")
}

/// `go depth ...` command for a query.
pub fn go_command(depth: u8) -> String {
    format!("go depth {}", depth.max(1))
}

/// `setoption` command selecting the number of candidate lines.
pub fn multipv_command(variants: u8) -> String {
    format!("setoption name MultiPV value {}", variants.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handshake_lines() {
        assert_eq!(parse_engine_line("uciok").unwrap(), Some(EngineReply::UciOk));
        assert_eq!(
            parse_engine_line("readyok").unwrap(),
            Some(EngineReply::ReadyOk)
        );
    }

    #[test]
    fn test_parse_bestmove_with_and_without_ponder() {
        assert_eq!(
            parse_engine_line("bestmove e2e4 ponder e7e5").unwrap(),
            Some(EngineReply::BestMove(Some("e2e4".into())))
        );
        assert_eq!(
            parse_engine_line("bestmove e7e8q").unwrap(),
            Some(EngineReply::BestMove(Some("e7e8q".into())))
        );
    }

    #[test]
    fn test_parse_explicit_no_move() {
        assert_eq!(
            parse_engine_line("bestmove (none)").unwrap(),
            Some(EngineReply::BestMove(None))
        );
        assert_eq!(
            parse_engine_line("bestmove 0000").unwrap(),
            Some(EngineReply::BestMove(None))
        );
    }

    #[test]
    fn test_reject_garbled_bestmove() {
        assert!(parse_engine_line("bestmove").is_err());
        assert!(parse_engine_line("bestmove zz9x").is_err());
    }

    #[test]
    fn test_extract_variant_heads() {
        let reply = parse_engine_line(
            "info depth 10 seldepth 14 multipv 2 score cp -31 nodes 82344 pv e7e5 g1f3",
        )
        .unwrap();
        assert_eq!(
            reply,
            Some(EngineReply::VariantHead {
                index: 2,
                notation: "e7e5".into()
            })
        );
    }

    #[test]
    fn test_ignore_chatter() {
        assert_eq!(parse_engine_line("id name Stockfish 16").unwrap(), None);
        assert_eq!(
            parse_engine_line("option name Hash type spin default 16").unwrap(),
            None
        );
        assert_eq!(parse_engine_line("info string NNUE enabled").unwrap(), None);
        assert_eq!(parse_engine_line("info depth 5 score cp 12").unwrap(), None);
    }

    #[test]
    fn test_format_query_commands() {
        assert_eq!(position_command("8/8/8/8/8/8/8/K6k w - - 0 1"),
            "position fen 8/8/8/8/8/8/8/K6k w - - 0 1");
        assert_eq!(go_command(2), "go depth 2");
        assert_eq!(go_command(0), "go depth 1");
        assert_eq!(multipv_command(3), "setoption name MultiPV value 3");
    }
}
