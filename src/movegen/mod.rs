//! Legal move generation.
//!
//! Pseudo-legal moves are generated per piece kind via bitboard shifts and
//! the shared attack tables, then filtered to legal moves using a pin set
//! and check count computed once per call rather than by trying every move
//! with make/unmake. King moves, castling, and en-passant get a full
//! re-check against king safety since pin detection alone doesn't cover
//! them.

mod pins;

use crate::attacks;
use crate::position::{Board, Position};
use crate::types::{Bitboard, Color, Move, MoveList, PieceKind, Square, PROMOTION_PIECES};

use pins::{compute_pins, PinSet};

/// Generate every legal move for the side to move.
#[must_use]
pub fn generate_legal_moves(pos: &Position) -> MoveList {
    let board = pos.board();
    let color = pos.side_to_move();
    let enemy = color.opponent();
    let occupied = board.occupancy();
    let own = board.occupancy_for(color);
    let king_sq = board.king_square(color);

    let checkers = attacks::attackers_to(king_sq, occupied, enemy, |c, k| board.pieces_of(c, k));
    let check_count = checkers.popcount();
    let pins = compute_pins(board, color);

    let mut moves = MoveList::new();

    generate_king_moves(pos, board, color, occupied, &mut moves);
    if check_count >= 2 {
        return moves;
    }

    let block_mask = if check_count == 1 {
        let checker_sq = checkers.lsb().expect("check_count == 1");
        attacks::path(king_sq, checker_sq) | Bitboard::from_square(checker_sq)
    } else {
        Bitboard::ALL
    };

    generate_pawn_moves(pos, board, color, occupied, own, block_mask, &pins, king_sq, &mut moves);
    generate_leaper_moves(PieceKind::Knight, board, color, own, block_mask, &pins, &mut moves, |sq, _| {
        attacks::knight_attacks(sq)
    });
    generate_slider_moves(PieceKind::Bishop, board, color, occupied, own, block_mask, &pins, &mut moves);
    generate_slider_moves(PieceKind::Rook, board, color, occupied, own, block_mask, &pins, &mut moves);
    generate_slider_moves(PieceKind::Queen, board, color, occupied, own, block_mask, &pins, &mut moves);

    moves
}

fn legal_destinations(from: Square, raw: Bitboard, own: Bitboard, block_mask: Bitboard, pins: &PinSet) -> Bitboard {
    let mut dest = raw & !own & block_mask;
    if let Some(allowed) = pins.allowed_for(from) {
        dest &= allowed;
    }
    dest
}

fn generate_leaper_moves(
    kind: PieceKind,
    board: &Board,
    color: Color,
    own: Bitboard,
    block_mask: Bitboard,
    pins: &PinSet,
    moves: &mut MoveList,
    attack_fn: impl Fn(Square, Color) -> Bitboard,
) {
    for from in board.pieces_of(color, kind).iter() {
        let raw = attack_fn(from, color);
        let dest = legal_destinations(from, raw, own, block_mask, pins);
        for to in dest.iter() {
            if board.piece_at(to).is_empty() {
                moves.push(Move::quiet(from, to));
            } else {
                moves.push(Move::capture(from, to));
            }
        }
    }
}

fn generate_slider_moves(
    kind: PieceKind,
    board: &Board,
    color: Color,
    occupied: Bitboard,
    own: Bitboard,
    block_mask: Bitboard,
    pins: &PinSet,
    moves: &mut MoveList,
) {
    for from in board.pieces_of(color, kind).iter() {
        let raw = attacks::attacks_for(kind, color, from, occupied);
        let dest = legal_destinations(from, raw, own, block_mask, pins);
        for to in dest.iter() {
            if board.piece_at(to).is_empty() {
                moves.push(Move::quiet(from, to));
            } else {
                moves.push(Move::capture(from, to));
            }
        }
    }
}

fn generate_king_moves(pos: &Position, board: &Board, color: Color, occupied: Bitboard, moves: &mut MoveList) {
    let from = board.king_square(color);
    let own = board.occupancy_for(color);
    let enemy = color.opponent();
    let occupied_without_king = occupied & !Bitboard::from_square(from);

    for to in (attacks::king_attacks(from) & !own).iter() {
        if king_safe_at(board, to, occupied_without_king, enemy) {
            if board.piece_at(to).is_empty() {
                moves.push(Move::quiet(from, to));
            } else {
                moves.push(Move::capture(from, to));
            }
        }
    }

    let turn = pos.turn();
    if !king_safe_at(board, from, occupied, enemy) {
        return;
    }
    let rank = from.rank();
    if turn.castling.has(color, true) {
        let f = Square::new(rank, 5);
        let g = Square::new(rank, 6);
        let path_clear = board.piece_at(f).is_empty() && board.piece_at(g).is_empty();
        if path_clear
            && king_safe_at(board, f, occupied, enemy)
            && king_safe_at(board, g, occupied, enemy)
        {
            moves.push(Move::castle_kingside(from, g));
        }
    }
    if turn.castling.has(color, false) {
        let d = Square::new(rank, 3);
        let c = Square::new(rank, 2);
        let b = Square::new(rank, 1);
        let path_clear =
            board.piece_at(d).is_empty() && board.piece_at(c).is_empty() && board.piece_at(b).is_empty();
        if path_clear && king_safe_at(board, d, occupied, enemy) && king_safe_at(board, c, occupied, enemy) {
            moves.push(Move::castle_queenside(from, c));
        }
    }
}

fn king_safe_at(board: &Board, sq: Square, occupied: Bitboard, enemy: Color) -> bool {
    !attacks::is_attacked(sq, occupied, enemy, |c, k| board.pieces_of(c, k))
}

#[allow(clippy::too_many_arguments)]
fn generate_pawn_moves(
    pos: &Position,
    board: &Board,
    color: Color,
    occupied: Bitboard,
    own: Bitboard,
    block_mask: Bitboard,
    pins: &PinSet,
    king_sq: Square,
    moves: &mut MoveList,
) {
    let is_white = color == Color::White;
    let pawns = board.pieces_of(color, PieceKind::Pawn);
    let empty = !occupied;
    let enemy = color.opponent();
    let enemy_occ = board.occupancy_for(enemy);
    let promo_rank = if is_white { 7 } else { 0 };
    let start_rank = if is_white { 1 } else { 6 };

    for from in pawns.iter() {
        let single_to = if let Some(sq) = from.forward(is_white) { sq } else { continue };
        let allowed = pins.allowed_for(from);

        if empty.contains(single_to) {
            if allow(single_to, block_mask, allowed) {
                push_pawn_move(from, single_to, promo_rank, false, moves);
            }
            if from.rank() == start_rank {
                let double_to = single_to.forward(is_white).expect("double push stays on board");
                if empty.contains(double_to) && allow(double_to, block_mask, allowed) {
                    moves.push(Move::double_push(from, double_to));
                }
            }
        }

        for to in (attacks::pawn_attacks(color, from) & enemy_occ).iter() {
            if allow(to, block_mask, allowed) {
                push_pawn_move(from, to, promo_rank, true, moves);
            }
        }

        if let Some(ep_sq) = pos.turn().en_passant {
            if attacks::pawn_attacks(color, from).contains(ep_sq) {
                if let Some(mask) = allowed {
                    if !mask.contains(ep_sq) {
                        continue;
                    }
                }
                if en_passant_is_legal(board, color, from, ep_sq, king_sq, occupied) {
                    moves.push(Move::en_passant(from, ep_sq));
                }
            }
        }
    }
}

fn allow(to: Square, block_mask: Bitboard, pin_allowed: Option<Bitboard>) -> bool {
    if !block_mask.contains(to) {
        return false;
    }
    match pin_allowed {
        Some(mask) => mask.contains(to),
        None => true,
    }
}

fn push_pawn_move(from: Square, to: Square, promo_rank: usize, capture: bool, moves: &mut MoveList) {
    if to.rank() == promo_rank {
        for &piece in &PROMOTION_PIECES {
            moves.push(Move::promotion_move(from, to, piece, capture));
        }
    } else if capture {
        moves.push(Move::capture(from, to));
    } else {
        moves.push(Move::quiet(from, to));
    }
}

/// En-passant can expose a discovered check along the capturing pawn's rank
/// (both pawns disappear at once), which pin detection never catches, so it
/// gets a direct simulate-and-test instead of trusting the pin set.
fn en_passant_is_legal(
    board: &Board,
    color: Color,
    from: Square,
    ep_sq: Square,
    king_sq: Square,
    occupied: Bitboard,
) -> bool {
    let captured_rank = if color == Color::White { ep_sq.rank() - 1 } else { ep_sq.rank() + 1 };
    let captured_sq = Square::new(captured_rank, ep_sq.file());
    let occupied_after = (occupied
        & !Bitboard::from_square(from)
        & !Bitboard::from_square(captured_sq))
        | Bitboard::from_square(ep_sq);
    let enemy = color.opponent();
    !attacks::is_attacked(king_sq, occupied_after, enemy, |c, k| board.pieces_of(c, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_has_20_legal_moves() {
        let pos = Position::new();
        assert_eq!(generate_legal_moves(&pos).len(), 20);
    }

    #[test]
    fn pinned_knight_has_no_legal_moves_off_the_pin_line() {
        // A knight's jump never lands back on the file it started on, so a
        // knight pinned along a file can never move at all.
        let pos = Position::from_fen("4k3/4r3/8/8/4N3/8/8/4K3 w - - 0 1");
        let moves = generate_legal_moves(&pos);
        assert!(!moves.iter().any(|m| m.from() == Square::new(3, 4)));
    }

    #[test]
    fn pinned_rook_may_capture_along_the_pin_line() {
        let pos = Position::from_fen("4k3/4r3/8/8/4R3/8/8/4K3 w - - 0 1");
        let moves = generate_legal_moves(&pos);
        assert!(moves
            .iter()
            .any(|m| m.from() == Square::new(3, 4) && m.to() == Square::new(6, 4)));
        assert!(!moves.iter().any(|m| m.from() == Square::new(3, 4) && m.to().file() != 4));
    }

    #[test]
    fn double_check_only_allows_king_moves() {
        let pos = Position::from_fen("k3r3/8/8/8/8/3n4/8/4K3 w - - 0 1");
        let king_sq = Square::new(0, 4);
        let moves = generate_legal_moves(&pos);
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|m| m.from() == king_sq));
    }

    #[test]
    fn en_passant_exposing_discovered_check_is_illegal() {
        let pos = Position::from_fen("8/8/8/K2pP2r/8/8/8/7k w - d6 0 1");
        let moves = generate_legal_moves(&pos);
        assert!(!moves.iter().any(|m| m.is_en_passant()));
    }

    #[test]
    fn castling_requires_empty_and_safe_path() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let moves = generate_legal_moves(&pos);
        assert!(moves.iter().any(|m| m.is_castling()));
    }

    #[test]
    fn king_cannot_castle_through_attacked_square() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/7b/8/R3K2R w KQkq - 0 1");
        let moves = generate_legal_moves(&pos);
        assert!(!moves.iter().any(|m| m.is_castle_kingside()));
    }
}
