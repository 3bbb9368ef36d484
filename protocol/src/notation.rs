//! Coordinate move notation ("e2e4", "e7e8q") and the two castling encodings.
//!
//! The wire and UCI engines both use the standard two-square castling form
//! (e1g1), while cozy_chess plays castling as king-takes-rook (e1h1). Moves
//! are translated at the rules boundary in both directions.

use cozy_chess::{File, Move, Piece, Rank, Square};

use crate::ProtocolError;

/// Parse a coordinate move, promotion letter included ("e2e4", "e7e8q").
pub fn parse_move(s: &str) -> Result<Move, ProtocolError> {
    if s.len() < 4 || s.len() > 5 {
        return Err(ProtocolError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;

    let promotion = if s.len() == 5 {
        Some(parse_promotion(&s[4..5])?)
    } else {
        None
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// Format a move in coordinate notation.
pub fn format_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(promotion_char(promo));
    }
    s
}

/// Fuse a wire move payload (square pair plus optional promotion letter)
/// into the single-token form the rules layer consumes.
pub fn fuse_promotion(notation: &str, promotion: Option<char>) -> String {
    match promotion {
        Some(p) if notation.len() == 4 => format!("{notation}{p}"),
        _ => notation.to_string(),
    }
}

/// Split a fused move back into the wire payload shape.
pub fn split_promotion(notation: &str) -> (&str, Option<char>) {
    if notation.len() == 5 {
        (&notation[0..4], notation.chars().nth(4))
    } else {
        (notation, None)
    }
}

/// Convert a standard-notation castling move into the king-takes-rook form
/// cozy_chess plays, by finding the matching legal move.
///
/// Anything that is not a castling move (or does not match a legal rook
/// target) is returned unchanged.
pub fn to_rules_castling(mv: Move, legal_moves: &[Move]) -> Move {
    let on_home_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let from_e_file = matches!(mv.from.file(), File::E);
    let to_castle_file = matches!(mv.to.file(), File::G | File::C);

    if on_home_rank && from_e_file && to_castle_file && mv.promotion.is_none() {
        let rook_file = match mv.to.file() {
            File::G => File::H,
            _ => File::A,
        };
        let converted = Move {
            from: mv.from,
            to: Square::new(rook_file, mv.from.rank()),
            promotion: None,
        };
        if legal_moves.contains(&converted) {
            return converted;
        }
    }

    mv
}

/// Convert a king-takes-rook castling move back into the standard two-square
/// form the wire expects. `moved` is the piece standing on `mv.from`.
pub fn to_wire_castling(mv: Move, moved: Piece) -> Move {
    let on_home_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let from_e_file = matches!(mv.from.file(), File::E);
    let to_rook_file = matches!(mv.to.file(), File::H | File::A);

    if moved == Piece::King && on_home_rank && from_e_file && to_rook_file {
        let king_file = match mv.to.file() {
            File::H => File::G,
            _ => File::C,
        };
        return Move {
            from: mv.from,
            to: Square::new(king_file, mv.from.rank()),
            promotion: None,
        };
    }

    mv
}

fn parse_square(s: &str) -> Result<Square, ProtocolError> {
    let mut chars = s.chars();
    let (Some(file_c), Some(rank_c)) = (chars.next(), chars.next()) else {
        return Err(ProtocolError::InvalidSquare(s.to_string()));
    };

    let file = match file_c {
        'a' => File::A,
        'b' => File::B,
        'c' => File::C,
        'd' => File::D,
        'e' => File::E,
        'f' => File::F,
        'g' => File::G,
        'h' => File::H,
        _ => return Err(ProtocolError::InvalidSquare(s.to_string())),
    };

    let rank = match rank_c {
        '1' => Rank::First,
        '2' => Rank::Second,
        '3' => Rank::Third,
        '4' => Rank::Fourth,
        '5' => Rank::Fifth,
        '6' => Rank::Sixth,
        '7' => Rank::Seventh,
        '8' => Rank::Eighth,
        _ => return Err(ProtocolError::InvalidSquare(s.to_string())),
    };

    Ok(Square::new(file, rank))
}

fn parse_promotion(s: &str) -> Result<Piece, ProtocolError> {
    match s {
        "q" => Ok(Piece::Queen),
        "r" => Ok(Piece::Rook),
        "b" => Ok(Piece::Bishop),
        "n" => Ok(Piece::Knight),
        _ => Err(ProtocolError::InvalidPromotion(s.to_string())),
    }
}

fn promotion_char(p: Piece) -> char {
    match p {
        Piece::Queen => 'q',
        Piece::Rook => 'r',
        Piece::Bishop => 'b',
        Piece::Knight => 'n',
        Piece::Pawn | Piece::King => '?',
    }
}

fn format_square(sq: Square) -> String {
    let file = match sq.file() {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    };
    let rank = match sq.rank() {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    };
    format!("{file}{rank}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::Board;

    fn legal_moves(board: &Board) -> Vec<Move> {
        let mut moves = Vec::new();
        board.generate_moves(|batch| {
            moves.extend(batch);
            false
        });
        moves
    }

    #[test]
    fn test_parse_move_plain_and_promotion() {
        let mv = parse_move("e2e4").unwrap();
        assert_eq!(format_move(mv), "e2e4");

        let mv = parse_move("e7e8q").unwrap();
        assert_eq!(mv.promotion, Some(Piece::Queen));
        assert_eq!(format_move(mv), "e7e8q");
    }

    #[test]
    fn test_parse_move_rejects_garbage() {
        assert!(parse_move("").is_err());
        assert!(parse_move("e2").is_err());
        assert!(parse_move("e2e9").is_err());
        assert!(parse_move("x2e4").is_err());
        assert!(parse_move("e7e8k").is_err());
        assert!(parse_move("e2e4e5").is_err());
    }

    #[test]
    fn test_fuse_and_split_promotion() {
        assert_eq!(fuse_promotion("e7e8", Some('q')), "e7e8q");
        assert_eq!(fuse_promotion("e2e4", None), "e2e4");
        assert_eq!(split_promotion("e7e8q"), ("e7e8", Some('q')));
        assert_eq!(split_promotion("e2e4"), ("e2e4", None));
    }

    #[test]
    fn test_castling_to_rules_form() {
        // White ready to castle kingside.
        let board: Board = "rnbqkbnr/pppppppp/8/8/8/5NP1/PPPPPPBP/RNBQK2R w KQkq - 0 1"
            .parse()
            .unwrap();
        let legal = legal_moves(&board);

        let wire = parse_move("e1g1").unwrap();
        let converted = to_rules_castling(wire, &legal);
        assert_eq!(format_move(converted), "e1h1");
        assert!(legal.contains(&converted));
    }

    #[test]
    fn test_non_castling_king_move_untouched() {
        let board: Board = "rnbqkbnr/pppppppp/8/8/8/5NP1/PPPPPPBP/RNBQK2R w KQkq - 0 1"
            .parse()
            .unwrap();
        let legal = legal_moves(&board);

        let mv = parse_move("e1f1").unwrap();
        assert_eq!(to_rules_castling(mv, &legal), mv);
    }

    #[test]
    fn test_castling_to_wire_form() {
        let mv = parse_move("e1h1").unwrap();
        let wire = to_wire_castling(mv, Piece::King);
        assert_eq!(format_move(wire), "e1g1");

        let mv = parse_move("e8a8").unwrap();
        let wire = to_wire_castling(mv, Piece::King);
        assert_eq!(format_move(wire), "e8c8");

        // A rook sliding e1 to h1 is not castling.
        let mv = parse_move("e1h1").unwrap();
        assert_eq!(to_wire_castling(mv, Piece::Rook), mv);
    }
}
