//! HalfKP NNUE evaluation.
//!
//! A full-recompute (non-incremental) implementation: `evaluate` rebuilds
//! both perspective accumulators from the position every call. An
//! incremental per-ply accumulator stack is permitted but not required,
//! and isn't implemented here.

pub mod network;

use crate::position::Position;
use crate::types::{Color, PieceKind, Square};
use network::{NnueNetwork, HALF_DIMENSIONS, OUTPUT_DIMENSIONS};

/// Raw network output is scaled by this factor to land in centipawns.
const SCALE_TO_CENTIPAWNS: f64 = 0.0301;

/// Non-king piece kinds get a HalfKP feature slot, indexed in this order.
#[inline]
#[must_use]
fn halfkp_piece_index(kind: PieceKind) -> Option<usize> {
    match kind {
        PieceKind::Pawn => Some(0),
        PieceKind::Knight => Some(1),
        PieceKind::Bishop => Some(2),
        PieceKind::Rook => Some(3),
        PieceKind::Queen => Some(4),
        PieceKind::King => None,
    }
}

#[inline]
#[must_use]
fn orient(sq_index: usize, perspective: Color) -> usize {
    if perspective == Color::Black {
        sq_index ^ 56
    } else {
        sq_index
    }
}

/// HalfKP feature index for a non-king piece, from `perspective`'s point of
/// view: `king_sq * 641 + (piece_sq + (piece_kind*2 + relative_color) * 64 + 1)`,
/// where `relative_color` is 0 for the perspective's own pieces and 1 for
/// the opponent's. King square 64 possibilities times 641 (640 piece/color/
/// square combinations plus the reserved zero slot) gives the 41 024 inputs.
#[must_use]
fn halfkp_feature(
    perspective: Color,
    king_sq: Square,
    piece_color: Color,
    kind: PieceKind,
    piece_sq: Square,
) -> Option<usize> {
    let piece_index = halfkp_piece_index(kind)?;
    let relative_color = usize::from(piece_color != perspective);
    let oriented_king = orient(king_sq.as_index(), perspective);
    let oriented_piece = orient(piece_sq.as_index(), perspective);
    let sub_index = oriented_piece + (piece_index * 2 + relative_color) * 64 + 1;
    Some(oriented_king * 641 + sub_index)
}

/// Build one perspective's 256-wide half-accumulator from scratch.
fn transform(network: &NnueNetwork, pos: &Position, perspective: Color) -> [i16; HALF_DIMENSIONS] {
    let board = pos.board();
    let king_sq = board.king_square(perspective);
    let mut acc = [0i16; HALF_DIMENSIONS];
    for (h, slot) in acc.iter_mut().enumerate() {
        *slot = network.input.bias[h];
    }

    for color in [Color::White, Color::Black] {
        for kind in [
            PieceKind::Pawn,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Rook,
            PieceKind::Queen,
        ] {
            let mut bb = board.pieces_of(color, kind);
            while let Some(sq) = bb.pop_lsb() {
                let Some(feature) = halfkp_feature(perspective, king_sq, color, kind, sq) else {
                    continue;
                };
                for h in 0..HALF_DIMENSIONS {
                    acc[h] = acc[h].saturating_add(network.half_weight(h, feature));
                }
            }
        }
    }
    acc
}

/// Evaluate a position through the network, from the side-to-move's
/// perspective (matching the static evaluator's contract, unlike the
/// always-white-relative convention the file format's own documentation
/// describes).
#[must_use]
pub fn evaluate(network: &NnueNetwork, pos: &Position) -> i32 {
    let white = transform(network, pos, Color::White);
    let black = transform(network, pos, Color::Black);
    let (own, other) = if pos.side_to_move() == Color::White { (white, black) } else { (black, white) };

    let mut combined = [0i16; OUTPUT_DIMENSIONS];
    combined[..HALF_DIMENSIONS].copy_from_slice(&own);
    combined[HALF_DIMENSIONS..].copy_from_slice(&other);

    let raw = network.forward(&combined);
    (f64::from(raw) * SCALE_TO_CENTIPAWNS).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn halfkp_feature_indices_stay_in_range() {
        let pos = Position::new();
        let board = pos.board();
        for perspective in [Color::White, Color::Black] {
            let king_sq = board.king_square(perspective);
            for color in [Color::White, Color::Black] {
                for kind in [
                    PieceKind::Pawn,
                    PieceKind::Knight,
                    PieceKind::Bishop,
                    PieceKind::Rook,
                    PieceKind::Queen,
                ] {
                    let mut bb = board.pieces_of(color, kind);
                    while let Some(sq) = bb.pop_lsb() {
                        let feature =
                            halfkp_feature(perspective, king_sq, color, kind, sq).unwrap();
                        assert!(feature < network::INPUT_DIMENSIONS);
                    }
                }
            }
        }
    }

    #[test]
    fn king_has_no_feature_slot() {
        assert!(halfkp_piece_index(PieceKind::King).is_none());
    }

    #[test]
    fn zero_network_evaluates_startpos_to_zero() {
        let network = NnueNetwork::zero();
        let pos = Position::new();
        assert_eq!(evaluate(&network, &pos), 0);
    }
}
