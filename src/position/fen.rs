//! FEN construction: a thin internal primitive, not a full parser/writer
//! subsystem. Only enough to build and round-trip a `Position`.

use std::str::FromStr;

use super::{Board, Position, RepetitionTable, Turn};
use crate::error::FenError;
use crate::types::{CastlingMask, Color, Piece, PieceKind, Square};

impl Position {
    /// Parse a position from FEN notation.
    pub fn try_from_fen(fen: &str) -> Result<Self, FenError> {
        let mut board = Board::empty();
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(FenError::TooFewParts { found: parts.len() });
        }

        for (rank_from_top, rank_str) in parts[0].split('/').enumerate() {
            if rank_from_top >= 8 {
                return Err(FenError::InvalidRank { rank: rank_from_top });
            }
            let rank = 7 - rank_from_top;
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let color = if c.is_uppercase() { Color::White } else { Color::Black };
                    let kind = PieceKind::from_char(c).ok_or(FenError::InvalidPiece { char: c })?;
                    if file >= 8 {
                        return Err(FenError::TooManyFiles { rank: rank_from_top, files: file + 1 });
                    }
                    board.set_piece(Square::new(rank, file), color, kind);
                    file += 1;
                }
            }
        }

        let active = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidSideToMove { found: other.to_string() }),
        };

        let mut castling = CastlingMask::none();
        for c in parts[2].chars() {
            match c {
                'K' => castling.set(Color::White, true),
                'Q' => castling.set(Color::White, false),
                'k' => castling.set(Color::Black, true),
                'q' => castling.set(Color::Black, false),
                '-' => {}
                _ => return Err(FenError::InvalidCastling { char: c }),
            }
        }

        let en_passant = if parts[3] == "-" {
            None
        } else {
            Some(
                Square::from_str(parts[3])
                    .map_err(|_| FenError::InvalidEnPassant { found: parts[3].to_string() })?,
            )
        };

        let halfmove_clock = if parts.len() >= 5 {
            parts[4].parse().map_err(|_| FenError::InvalidCounter { found: parts[4].to_string() })?
        } else {
            0
        };
        let fullmove_number = if parts.len() >= 6 {
            parts[5].parse().map_err(|_| FenError::InvalidCounter { found: parts[5].to_string() })?
        } else {
            1
        };

        let turn = Turn { active, castling, en_passant, halfmove_clock, fullmove_number };
        let mut pos = Position {
            board,
            turn,
            hash: 0,
            eval_mg: [0, 0],
            eval_eg: [0, 0],
            game_phase: [0, 0],
            repetition_counts: RepetitionTable::new(),
        };
        pos.hash = pos.calculate_hash();
        pos.repetition_counts.set(pos.hash, 1);
        pos.recalculate_incremental_eval();
        Ok(pos)
    }

    /// # Panics
    /// Panics if `fen` is invalid. Use `try_from_fen` for fallible parsing.
    #[must_use]
    pub fn from_fen(fen: &str) -> Self {
        Self::try_from_fen(fen).expect("invalid FEN string")
    }

    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut rows = Vec::with_capacity(8);
        for rank in (0..8).rev() {
            let mut row = String::new();
            let mut empty = 0u32;
            for file in 0..8 {
                let piece = self.board.piece_at(Square::new(rank, file));
                if piece.is_empty() {
                    empty += 1;
                    continue;
                }
                if empty > 0 {
                    row.push_str(&empty.to_string());
                    empty = 0;
                }
                row.push(piece_to_fen_char(piece));
            }
            if empty > 0 {
                row.push_str(&empty.to_string());
            }
            rows.push(row);
        }

        let active = if self.turn.active == Color::White { "w" } else { "b" };
        let mut castling = String::new();
        for (color, ch) in [(Color::White, 'K'), (Color::White, 'Q')] {
            if self.turn.castling.has(color, ch == 'K') {
                castling.push(ch);
            }
        }
        for (color, ch) in [(Color::Black, 'k'), (Color::Black, 'q')] {
            if self.turn.castling.has(color, ch == 'k') {
                castling.push(ch);
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }
        let ep = self.turn.en_passant.map_or_else(|| "-".to_string(), |sq| sq.to_string());

        format!(
            "{} {} {} {} {} {}",
            rows.join("/"),
            active,
            castling,
            ep,
            self.turn.halfmove_clock,
            self.turn.fullmove_number
        )
    }
}

fn piece_to_fen_char(piece: Piece) -> char {
    let color = piece.color().expect("non-empty piece has a color");
    let kind = piece.kind().expect("non-empty piece has a kind");
    kind.to_fen_char(color)
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::try_from_fen(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn startpos_round_trips() {
        let pos = Position::from_fen(STARTPOS);
        assert_eq!(pos.to_fen(), STARTPOS);
        assert_eq!(pos, Position::new());
    }

    #[test]
    fn en_passant_square_parses() {
        let fen = "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3";
        let pos = Position::from_fen(fen);
        assert_eq!(pos.turn.en_passant, Some(Square::from_str("d6").unwrap()));
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn too_few_parts_is_rejected() {
        assert!(matches!(
            Position::try_from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"),
            Err(FenError::TooFewParts { .. })
        ));
    }

    #[test]
    fn invalid_piece_char_is_rejected() {
        assert!(matches!(
            Position::try_from_fen("rnbqkbnx/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(FenError::InvalidPiece { char: 'x' })
        ));
    }
}
