//! Zobrist hashing: incrementally-updatable 64-bit position hashes for the
//! transposition table.

use rand::prelude::*;
use std::sync::LazyLock;

use crate::types::{Color, PieceKind};

pub(crate) struct ZobristKeys {
    /// `piece_keys[piece_kind][color][square]`.
    pub(crate) piece_keys: [[[u64; 64]; 2]; 6],
    pub(crate) black_to_move_key: u64,
    /// `castling_keys[color][side]`, side 0 = kingside, 1 = queenside.
    pub(crate) castling_keys: [[u64; 2]; 2],
    /// Indexed by en-passant target file; only the file matters.
    pub(crate) en_passant_keys: [u64; 8],
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(1234567890_u64);
        let mut piece_keys = [[[0u64; 64]; 2]; 6];
        let mut castling_keys = [[0u64; 2]; 2];
        let mut en_passant_keys = [0u64; 8];

        for kind in &mut piece_keys {
            for color in kind.iter_mut() {
                for key in color.iter_mut() {
                    *key = rng.gen();
                }
            }
        }

        let black_to_move_key = rng.gen();

        for color in &mut castling_keys {
            for key in color.iter_mut() {
                *key = rng.gen();
            }
        }

        for key in &mut en_passant_keys {
            *key = rng.gen();
        }

        ZobristKeys { piece_keys, black_to_move_key, castling_keys, en_passant_keys }
    }

    #[inline]
    pub(crate) fn piece(&self, kind: PieceKind, color: Color, sq: crate::types::Square) -> u64 {
        self.piece_keys[kind.index()][color.index()][sq.as_index()]
    }

    #[inline]
    pub(crate) fn castling(&self, color: Color, kingside: bool) -> u64 {
        self.castling_keys[color.index()][if kingside { 0 } else { 1 }]
    }

    #[inline]
    pub(crate) fn en_passant(&self, file: usize) -> u64 {
        self.en_passant_keys[file]
    }
}

pub(crate) static ZOBRIST: LazyLock<ZobristKeys> = LazyLock::new(ZobristKeys::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_fixed_across_calls() {
        let a = ZobristKeys::new();
        let b = ZobristKeys::new();
        assert_eq!(a.black_to_move_key, b.black_to_move_key);
        assert_eq!(a.piece_keys[0][0][0], b.piece_keys[0][0][0]);
    }

    #[test]
    fn keys_are_distinct_enough() {
        let keys = &*ZOBRIST;
        let mut seen = std::collections::HashSet::new();
        for kind in &keys.piece_keys {
            for color in kind {
                for &key in color {
                    assert!(seen.insert(key), "duplicate zobrist key");
                }
            }
        }
    }
}
