//! Pin detection: computed once per legality query rather than per move.

use crate::attacks;
use crate::position::Board;
use crate::types::{Bitboard, Color, PieceKind, Square};

/// One pinned piece and the line it is constrained to move along (the
/// squares between the king and the pinning slider, plus the pinner's own
/// square — capturing the pinner is always legal).
#[derive(Clone, Copy, Debug)]
pub(crate) struct Pin {
    pub(crate) square: Square,
    pub(crate) allowed: Bitboard,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct PinSet {
    pins: Vec<Pin>,
}

impl PinSet {
    #[must_use]
    pub(crate) fn allowed_for(&self, sq: Square) -> Option<Bitboard> {
        self.pins.iter().find(|p| p.square == sq).map(|p| p.allowed)
    }

    #[must_use]
    pub(crate) fn is_pinned(&self, sq: Square) -> bool {
        self.pins.iter().any(|p| p.square == sq)
    }
}

/// Find every piece of `color` pinned against its own king by an enemy
/// slider, scanning outward from the king along rook and bishop rays.
pub(crate) fn compute_pins(board: &Board, color: Color) -> PinSet {
    let king_sq = board.king_square(color);
    let own = board.occupancy_for(color);
    let enemy = color.opponent();
    let occupied = board.occupancy();

    let rook_like = board.pieces_of(enemy, PieceKind::Rook) | board.pieces_of(enemy, PieceKind::Queen);
    let bishop_like = board.pieces_of(enemy, PieceKind::Bishop) | board.pieces_of(enemy, PieceKind::Queen);

    let mut pins = Vec::new();
    for slider_sq in rook_like.iter() {
        if slider_sq.rank() != king_sq.rank() && slider_sq.file() != king_sq.file() {
            continue;
        }
        collect_pin(king_sq, slider_sq, own, occupied, &mut pins);
    }
    for slider_sq in bishop_like.iter() {
        let dr = slider_sq.rank() as isize - king_sq.rank() as isize;
        let df = slider_sq.file() as isize - king_sq.file() as isize;
        if dr.abs() != df.abs() {
            continue;
        }
        collect_pin(king_sq, slider_sq, own, occupied, &mut pins);
    }
    PinSet { pins }
}

fn collect_pin(king_sq: Square, slider_sq: Square, own: Bitboard, occupied: Bitboard, pins: &mut Vec<Pin>) {
    let between = attacks::path(king_sq, slider_sq);
    let blockers = between & occupied;
    if blockers.popcount() != 1 {
        return;
    }
    let blocker_sq = blockers.lsb().expect("popcount checked above");
    if !own.contains(blocker_sq) {
        return;
    }
    pins.push(Pin { square: blocker_sq, allowed: between | Bitboard::from_square(slider_sq) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn rook_pins_piece_on_shared_file() {
        let pos = Position::from_fen("4k3/4r3/8/8/4N3/8/8/4K3 w - - 0 1");
        let pins = compute_pins(pos.board(), Color::White);
        assert!(pins.is_pinned(Square::new(3, 4)));
        let allowed = pins.allowed_for(Square::new(3, 4)).unwrap();
        assert!(allowed.contains(Square::new(1, 4)));
        assert!(allowed.contains(Square::new(6, 4)));
        assert!(!allowed.contains(Square::new(3, 3)));
    }

    #[test]
    fn unrelated_piece_is_not_pinned() {
        let pos = Position::from_fen("4k3/8/8/8/4N3/8/8/4K3 w - - 0 1");
        let pins = compute_pins(pos.board(), Color::White);
        assert!(!pins.is_pinned(Square::new(3, 4)));
    }

    #[test]
    fn bishop_pins_along_diagonal() {
        let pos = Position::from_fen("4k3/8/8/7b/8/8/2N5/K7 w - - 0 1");
        let pins = compute_pins(pos.board(), Color::White);
        assert!(pins.is_pinned(Square::new(1, 2)));
    }

    #[test]
    fn exactly_one_pawn_is_pinned_behind_the_queen_on_the_long_diagonal() {
        let pos = Position::from_fen("rnb1kbnr/pp1ppppp/2p5/q7/8/PP6/2PPPPPP/RNBQKBNR w - - 0 1");
        let pins = compute_pins(pos.board(), Color::White);
        let pinned_squares: Vec<Square> =
            (0..64).map(Square::from_index).filter(|&sq| pins.is_pinned(sq)).collect();
        assert_eq!(pinned_squares, vec![Square::new(1, 3)]);
    }
}
