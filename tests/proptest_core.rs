//! Property-based tests over random legal-move sequences from the start
//! position: make/unmake round-tripping and the "every generated move
//! leaves its own king safe" legality invariant.

use chess_core::movegen::generate_legal_moves;
use chess_core::{attacks, Position, UnmakeInfo};
use proptest::prelude::*;
use rand::prelude::*;
use rand::Rng;

fn random_move_sequence_length() -> impl Strategy<Value = usize> {
    1..=30usize
}

fn random_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

proptest! {
    #[test]
    fn make_unmake_restores_the_position(seed in random_seed(), num_moves in random_move_sequence_length()) {
        let mut pos = Position::new();
        let mut rng = StdRng::seed_from_u64(seed);

        let initial_hash = pos.hash();
        let initial_fen = pos.to_fen();

        let mut history: Vec<(chess_core::Move, UnmakeInfo)> = Vec::new();
        for _ in 0..num_moves {
            let moves = generate_legal_moves(&pos);
            if moves.is_empty() {
                break;
            }
            let idx = rng.gen_range(0..moves.len());
            let mv = moves.get(idx).expect("idx in range");
            let info = pos.make_move(mv);
            history.push((mv, info));
        }

        while let Some((mv, info)) = history.pop() {
            pos.unmake_move(mv, info);
        }

        prop_assert_eq!(pos.hash(), initial_hash);
        prop_assert_eq!(pos.to_fen(), initial_fen);
    }

    #[test]
    fn every_legal_move_leaves_its_own_king_safe(seed in random_seed()) {
        let mut pos = Position::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..12 {
            let moves = generate_legal_moves(&pos);
            if moves.is_empty() {
                break;
            }

            let mover = pos.side_to_move();
            for mv in moves.iter() {
                let info = pos.make_move(*mv);
                let board = pos.board();
                let king_sq = board.king_square(mover);
                let attacked = attacks::is_attacked(
                    king_sq,
                    board.occupancy(),
                    mover.opponent(),
                    |c, k| board.pieces_of(c, k),
                );
                pos.unmake_move(*mv, info);
                prop_assert!(!attacked, "move {:?} left {:?} in check", mv, mover);
            }

            let idx = rng.gen_range(0..moves.len());
            let mv = moves.get(idx).expect("idx in range");
            pos.make_move(mv);
        }
    }
}
