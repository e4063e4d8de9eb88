//! Static Exchange Evaluation: material balance after all captures on one
//! square are played out in least-valuable-attacker order, including the
//! x-ray attacks a departing slider uncovers.

use crate::attacks;
use crate::position::Position;
use crate::types::{Bitboard, Color, PieceKind, Square};

const MAX_DEPTH: usize = 32;

/// Material balance (centipawns, from the mover's perspective) after the
/// full capture sequence on `to` starting with the piece on `from`.
/// Returns 0 if there is nothing to capture there.
#[must_use]
pub fn see(pos: &Position, from: Square, to: Square) -> i32 {
    let board = pos.board();
    let victim = if !board.piece_at(to).is_empty() {
        board.piece_at(to).kind()
    } else if pos.turn().en_passant == Some(to) {
        Some(PieceKind::Pawn)
    } else {
        None
    };
    let Some(victim) = victim else { return 0 };
    let Some(attacker) = board.piece_at(from).kind() else { return 0 };
    see_with_pieces(pos, from, to, attacker, victim)
}

/// Same as [`see`] but with the attacker/victim kinds already known,
/// avoiding redundant board lookups when the caller generated the move.
#[must_use]
pub fn see_with_pieces(pos: &Position, from: Square, to: Square, attacker: PieceKind, victim: PieceKind) -> i32 {
    let board = pos.board();
    let mut occupied = board.occupancy();
    let mut side = pos.side_to_move();

    let piece_bb = |c: Color, k: PieceKind| board.pieces_of(c, k);
    let mut attackers = attacks::attackers_to(to, occupied, Color::White, piece_bb)
        | attacks::attackers_to(to, occupied, Color::Black, piece_bb);

    let mut gain = [0i32; MAX_DEPTH];
    let mut depth = 0;
    gain[0] = victim.value();

    let mut current_attacker = attacker;
    let mut from_bb = Bitboard::from_square(from);

    loop {
        occupied &= !from_bb;
        attackers &= !from_bb;

        if matches!(current_attacker, PieceKind::Pawn | PieceKind::Bishop | PieceKind::Queen) {
            let diag = attacks::bishop_attacks(to, occupied)
                & (board.pieces_of(Color::White, PieceKind::Bishop)
                    | board.pieces_of(Color::Black, PieceKind::Bishop)
                    | board.pieces_of(Color::White, PieceKind::Queen)
                    | board.pieces_of(Color::Black, PieceKind::Queen));
            attackers |= diag & occupied;
        }
        if matches!(current_attacker, PieceKind::Rook | PieceKind::Queen) {
            let straight = attacks::rook_attacks(to, occupied)
                & (board.pieces_of(Color::White, PieceKind::Rook)
                    | board.pieces_of(Color::Black, PieceKind::Rook)
                    | board.pieces_of(Color::White, PieceKind::Queen)
                    | board.pieces_of(Color::Black, PieceKind::Queen));
            attackers |= straight & occupied;
        }

        side = side.opponent();
        let side_attackers = attackers & board.occupancy_for(side);
        if side_attackers.is_empty() {
            break;
        }

        depth += 1;
        if depth >= MAX_DEPTH {
            break;
        }

        let (lva_kind, lva_bb) = least_valuable_attacker(board, side_attackers, side);

        gain[depth] = current_attacker.value() - gain[depth - 1];
        if (-gain[depth - 1]).max(gain[depth]) < 0 {
            break;
        }

        if lva_kind == PieceKind::King {
            let opponent_attackers = attackers & board.occupancy_for(side.opponent());
            if !opponent_attackers.is_empty() {
                break;
            }
        }

        current_attacker = lva_kind;
        from_bb = lva_bb;
    }

    while depth > 0 {
        depth -= 1;
        gain[depth] = -(-gain[depth]).max(gain[depth + 1]);
    }
    gain[0]
}

fn least_valuable_attacker(
    board: &crate::position::Board,
    attackers: Bitboard,
    color: Color,
) -> (PieceKind, Bitboard) {
    for kind in PieceKind::ALL {
        let candidates = attackers & board.pieces_of(color, kind);
        if !candidates.is_empty() {
            let sq = candidates.lsb().expect("non-empty checked above");
            return (kind, Bitboard::from_square(sq));
        }
    }
    (PieceKind::Pawn, Bitboard::EMPTY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen)
    }

    #[test]
    fn simple_winning_capture() {
        let p = pos("8/8/8/3p4/4P3/8/8/8 w - - 0 1");
        assert_eq!(see(&p, Square::new(3, 4), Square::new(4, 3)), 100);
    }

    #[test]
    fn equal_exchange_is_zero() {
        let p = pos("8/8/2p5/3p4/4P3/8/8/8 w - - 0 1");
        assert_eq!(see(&p, Square::new(3, 4), Square::new(4, 3)), 0);
    }

    #[test]
    fn knight_takes_defended_pawn_is_losing() {
        let p = pos("8/8/2p5/3p4/4N3/8/8/8 w - - 0 1");
        assert!(see(&p, Square::new(3, 4), Square::new(4, 3)) < 0);
    }

    #[test]
    fn rook_xray_keeps_the_file_after_first_trade() {
        let p = pos("8/8/8/3r4/8/8/8/R2R4 w - - 0 1");
        assert_eq!(see(&p, Square::new(0, 3), Square::new(4, 3)), 500);
    }

    #[test]
    fn bishop_xray_through_bishop_wins_material() {
        let p = pos("8/8/5b2/4b3/3B4/2B5/8/8 w - - 0 1");
        assert!(see(&p, Square::new(2, 2), Square::new(4, 4)) > 0);
    }

    #[test]
    fn en_passant_capture_wins_a_pawn() {
        let p = pos("8/8/8/3Pp3/8/8/8/8 w - e6 0 1");
        assert_eq!(see(&p, Square::new(4, 3), Square::new(5, 4)), 100);
    }

    #[test]
    fn no_capture_on_empty_square_is_zero() {
        let p = pos("8/8/8/8/4N3/8/8/8 w - - 0 1");
        assert_eq!(see(&p, Square::new(3, 4), Square::new(5, 5)), 0);
    }
}
