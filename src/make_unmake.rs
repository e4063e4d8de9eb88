//! Make/unmake: mutate a `Position` in place and hand back an undo token
//! that restores it exactly, while incrementally maintaining the Zobrist
//! hash and the tapered material/PST eval terms in the same pass.

use crate::eval::pst::{pst_square, MATERIAL_EG, MATERIAL_MG, PHASE_WEIGHTS, PST_EG, PST_MG};
use crate::position::Position;
use crate::types::{Color, Move, PieceKind, Square};
use crate::zobrist::ZOBRIST;

/// Undo token produced by `Position::make_move`. Restoring a position from
/// one is the only supported way to "go backwards"; the fields mirror
/// exactly what `make_move` changed.
#[derive(Clone, Debug)]
pub struct UnmakeInfo {
    captured: Option<(Color, PieceKind)>,
    previous_en_passant: Option<Square>,
    previous_castling: crate::types::CastlingMask,
    previous_hash: u64,
    previous_halfmove_clock: u32,
    made_hash: u64,
    previous_repetition_count: u32,
    previous_eval_mg: [i32; 2],
    previous_eval_eg: [i32; 2],
    previous_game_phase: [i32; 2],
}

#[derive(Clone, Debug)]
pub struct NullMoveInfo {
    previous_en_passant: Option<Square>,
    previous_hash: u64,
}

impl Position {
    #[inline]
    fn has_castling_right(&self, color: Color, kingside: bool) -> bool {
        self.turn.castling.has(color, kingside)
    }

    #[inline]
    fn clear_castling_right(&mut self, color: Color, kingside: bool) -> u64 {
        if !self.has_castling_right(color, kingside) {
            return 0;
        }
        self.turn.castling.clear(color, kingside);
        ZOBRIST.castling(color, kingside)
    }

    fn remove_captured_piece(&mut self, sq: Square, captured: (Color, PieceKind), opp: usize) -> u64 {
        let (color, kind) = captured;
        let pst = pst_square(sq.as_index(), color == Color::White);
        self.board.remove_piece(sq, color, kind);
        self.eval_mg[opp] -= MATERIAL_MG[kind.index()] + PST_MG[kind.index()][pst];
        self.eval_eg[opp] -= MATERIAL_EG[kind.index()] + PST_EG[kind.index()][pst];
        self.game_phase[opp] -= PHASE_WEIGHTS[kind.index()];
        ZOBRIST.piece(kind, color, sq)
    }

    fn execute_castling(&mut self, mv: Move, color: Color, c_idx: usize, is_white: bool) -> u64 {
        let to_pst = pst_square(mv.to().as_index(), is_white);
        self.board.set_piece(mv.to(), color, PieceKind::King);
        self.eval_mg[c_idx] += MATERIAL_MG[5] + PST_MG[5][to_pst];
        self.eval_eg[c_idx] += MATERIAL_EG[5] + PST_EG[5][to_pst];
        self.game_phase[c_idx] += PHASE_WEIGHTS[5];

        let (rook_from_file, rook_to_file) = if mv.to().file() == 6 { (7, 5) } else { (0, 3) };
        let rook_from = Square::new(mv.to().rank(), rook_from_file);
        let rook_to = Square::new(mv.to().rank(), rook_to_file);
        self.board.remove_piece(rook_from, color, PieceKind::Rook);
        self.board.set_piece(rook_to, color, PieceKind::Rook);

        let from_pst = pst_square(rook_from.as_index(), is_white);
        let to_pst = pst_square(rook_to.as_index(), is_white);
        self.eval_mg[c_idx] -= MATERIAL_MG[3] + PST_MG[3][from_pst];
        self.eval_eg[c_idx] -= MATERIAL_EG[3] + PST_EG[3][from_pst];
        self.eval_mg[c_idx] += MATERIAL_MG[3] + PST_MG[3][to_pst];
        self.eval_eg[c_idx] += MATERIAL_EG[3] + PST_EG[3][to_pst];

        ZOBRIST.piece(PieceKind::Rook, color, rook_from) ^ ZOBRIST.piece(PieceKind::Rook, color, rook_to)
    }

    fn update_castling_rights(
        &mut self,
        mv: Move,
        moving: PieceKind,
        color: Color,
        captured: Option<(Color, PieceKind)>,
    ) -> u64 {
        let mut delta = 0u64;
        if moving == PieceKind::King {
            delta ^= self.clear_castling_right(color, true);
            delta ^= self.clear_castling_right(color, false);
        } else if moving == PieceKind::Rook {
            let start_rank = if color == Color::White { 0 } else { 7 };
            if mv.from() == Square::new(start_rank, 0) {
                delta ^= self.clear_castling_right(color, false);
            } else if mv.from() == Square::new(start_rank, 7) {
                delta ^= self.clear_castling_right(color, true);
            }
        }
        if let Some((cap_color, PieceKind::Rook)) = captured {
            let start_rank = if cap_color == Color::White { 0 } else { 7 };
            if mv.to() == Square::new(start_rank, 0) {
                delta ^= self.clear_castling_right(cap_color, false);
            } else if mv.to() == Square::new(start_rank, 7) {
                delta ^= self.clear_castling_right(cap_color, true);
            }
        }
        delta
    }

    fn capture_for_move(
        &mut self,
        mv: Move,
        is_white: bool,
        opp: usize,
    ) -> (Option<(Color, PieceKind)>, u64) {
        if mv.is_en_passant() {
            let capture_rank = if is_white { mv.to().rank() - 1 } else { mv.to().rank() + 1 };
            let capture_sq = Square::new(capture_rank, mv.to().file());
            return match self.board.piece_kind_color_at(capture_sq) {
                Some(captured) => {
                    let delta = self.remove_captured_piece(capture_sq, captured, opp);
                    (Some(captured), delta)
                }
                None => (None, 0),
            };
        }
        if mv.is_castling() {
            return (None, 0);
        }
        match self.board.piece_kind_color_at(mv.to()) {
            Some(captured) => {
                let delta = self.remove_captured_piece(mv.to(), captured, opp);
                (Some(captured), delta)
            }
            None => (None, 0),
        }
    }

    fn place_moving_piece(
        &mut self,
        mv: Move,
        color: Color,
        moving: PieceKind,
        c_idx: usize,
        is_white: bool,
    ) -> u64 {
        if mv.is_castling() {
            let king_hash = ZOBRIST.piece(PieceKind::King, color, mv.to());
            return king_hash ^ self.execute_castling(mv, color, c_idx, is_white);
        }
        let placed = mv.promotion().unwrap_or(moving);
        self.board.set_piece(mv.to(), color, placed);
        let to_pst = pst_square(mv.to().as_index(), is_white);
        self.eval_mg[c_idx] += MATERIAL_MG[placed.index()] + PST_MG[placed.index()][to_pst];
        self.eval_eg[c_idx] += MATERIAL_EG[placed.index()] + PST_EG[placed.index()][to_pst];
        self.game_phase[c_idx] += PHASE_WEIGHTS[placed.index()];
        ZOBRIST.piece(placed, color, mv.to())
    }

    fn update_en_passant_target(&mut self, mv: Move) -> u64 {
        self.turn.en_passant = None;
        if mv.is_double_push() {
            let ep_rank = (mv.from().rank() + mv.to().rank()) / 2;
            let ep_sq = Square::new(ep_rank, mv.from().file());
            self.turn.en_passant = Some(ep_sq);
            return ZOBRIST.en_passant(ep_sq.file());
        }
        0
    }

    fn update_halfmove_clock(&mut self, moving: PieceKind, is_capture: bool) {
        if moving == PieceKind::Pawn || is_capture {
            self.turn.halfmove_clock = 0;
        } else {
            self.turn.halfmove_clock = self.turn.halfmove_clock.saturating_add(1);
        }
    }

    fn record_repetition(&mut self, made_hash: u64) -> u32 {
        let previous = self.repetition_counts.get(made_hash);
        self.repetition_counts.increment(made_hash);
        previous
    }

    /// Apply `mv` in place. The caller must have verified `mv` is legal in
    /// the current position (legality is the move generator's job, not
    /// make/unmake's).
    pub fn make_move(&mut self, mv: Move) -> UnmakeInfo {
        let previous_hash = self.hash;
        let mut hash = self.hash;

        let previous_en_passant = self.turn.en_passant;
        let previous_castling = self.turn.castling;
        let previous_halfmove_clock = self.turn.halfmove_clock;
        let previous_eval_mg = self.eval_mg;
        let previous_eval_eg = self.eval_eg;
        let previous_game_phase = self.game_phase;

        let color = self.turn.active;
        let c_idx = color.index();
        let opp = 1 - c_idx;
        let is_white = color == Color::White;

        hash ^= ZOBRIST.black_to_move_key;
        if let Some(old_ep) = self.turn.en_passant {
            hash ^= ZOBRIST.en_passant(old_ep.file());
        }

        let (captured, capture_delta) = self.capture_for_move(mv, is_white, opp);
        hash ^= capture_delta;

        let (moving_color, moving) =
            self.board.piece_kind_color_at(mv.from()).expect("make_move: 'from' square is empty");
        debug_assert_eq!(moving_color, color);
        hash ^= ZOBRIST.piece(moving, color, mv.from());
        self.board.remove_piece(mv.from(), color, moving);

        let from_pst = pst_square(mv.from().as_index(), is_white);
        self.eval_mg[c_idx] -= MATERIAL_MG[moving.index()] + PST_MG[moving.index()][from_pst];
        self.eval_eg[c_idx] -= MATERIAL_EG[moving.index()] + PST_EG[moving.index()][from_pst];
        self.game_phase[c_idx] -= PHASE_WEIGHTS[moving.index()];

        hash ^= self.place_moving_piece(mv, color, moving, c_idx, is_white);
        hash ^= self.update_en_passant_target(mv);
        self.update_halfmove_clock(moving, mv.is_capture());
        hash ^= self.update_castling_rights(mv, moving, color, captured);

        self.turn.active = color.opponent();
        self.hash = hash;
        if self.turn.active == Color::White {
            self.turn.fullmove_number += 1;
        }
        let made_hash = hash;
        let previous_repetition_count = self.record_repetition(made_hash);

        UnmakeInfo {
            captured,
            previous_en_passant,
            previous_castling,
            previous_hash,
            previous_halfmove_clock,
            made_hash,
            previous_repetition_count,
            previous_eval_mg,
            previous_eval_eg,
            previous_game_phase,
        }
    }

    pub fn make_null_move(&mut self) -> NullMoveInfo {
        let previous_hash = self.hash;
        let previous_en_passant = self.turn.en_passant;
        let mut hash = self.hash;
        hash ^= ZOBRIST.black_to_move_key;
        if let Some(old_ep) = self.turn.en_passant {
            hash ^= ZOBRIST.en_passant(old_ep.file());
        }
        self.turn.en_passant = None;
        self.turn.active = self.turn.active.opponent();
        self.hash = hash;
        NullMoveInfo { previous_en_passant, previous_hash }
    }

    fn restore_castling_move(&mut self, mv: Move, color: Color) {
        self.board.set_piece(mv.from(), color, PieceKind::King);
        self.board.remove_piece(mv.to(), color, PieceKind::King);
        let (rook_orig_file, rook_moved_file) = if mv.to().file() == 6 { (7, 5) } else { (0, 3) };
        let rook_sq = Square::new(mv.to().rank(), rook_moved_file);
        self.board.remove_piece(rook_sq, color, PieceKind::Rook);
        self.board.set_piece(Square::new(mv.to().rank(), rook_orig_file), color, PieceKind::Rook);
    }

    fn restore_standard_move(&mut self, mv: Move, color: Color, info: &UnmakeInfo) {
        let (moved_color, moved_kind) =
            self.board.piece_kind_color_at(mv.to()).expect("unmake: 'to' square is empty");
        self.board.remove_piece(mv.to(), moved_color, moved_kind);
        let (from_color, from_kind) =
            if mv.promotion().is_some() { (color, PieceKind::Pawn) } else { (moved_color, moved_kind) };
        self.board.set_piece(mv.from(), from_color, from_kind);

        if mv.is_en_passant() {
            let capture_rank = if color == Color::White { mv.to().rank() - 1 } else { mv.to().rank() + 1 };
            if let Some((cap_color, cap_kind)) = info.captured {
                self.board.set_piece(Square::new(capture_rank, mv.to().file()), cap_color, cap_kind);
            }
        } else if let Some((cap_color, cap_kind)) = info.captured {
            self.board.set_piece(mv.to(), cap_color, cap_kind);
        }
    }

    pub fn unmake_move(&mut self, mv: Move, info: UnmakeInfo) {
        self.repetition_counts.set(info.made_hash, info.previous_repetition_count);
        self.turn.active = self.turn.active.opponent();
        self.turn.en_passant = info.previous_en_passant;
        self.turn.castling = info.previous_castling;
        self.hash = info.previous_hash;
        self.turn.halfmove_clock = info.previous_halfmove_clock;
        if self.turn.active == Color::Black {
            self.turn.fullmove_number -= 1;
        }
        self.eval_mg = info.previous_eval_mg;
        self.eval_eg = info.previous_eval_eg;
        self.game_phase = info.previous_game_phase;

        let color = self.turn.active;
        if mv.is_castling() {
            self.restore_castling_move(mv, color);
        } else {
            self.restore_standard_move(mv, color, &info);
        }
    }

    pub fn unmake_null_move(&mut self, info: NullMoveInfo) {
        self.turn.active = self.turn.active.opponent();
        self.turn.en_passant = info.previous_en_passant;
        self.hash = info.previous_hash;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_then_unmake_restores_hash_and_board() {
        let mut pos = Position::new();
        let before = pos.clone();
        let mv = Move::double_push(Square::new(1, 4), Square::new(3, 4));
        let info = pos.make_move(mv);
        assert_ne!(pos.hash, before.hash);
        assert_eq!(pos.hash, pos.calculate_hash());
        pos.unmake_move(mv, info);
        assert_eq!(pos, before);
        assert_eq!(pos.hash, before.hash);
    }

    #[test]
    fn null_move_flips_side_and_restores() {
        let mut pos = Position::new();
        let before_hash = pos.hash;
        let info = pos.make_null_move();
        assert_eq!(pos.turn.active, Color::Black);
        pos.unmake_null_move(info);
        assert_eq!(pos.turn.active, Color::White);
        assert_eq!(pos.hash, before_hash);
    }
}
