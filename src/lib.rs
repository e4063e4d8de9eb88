//! Bitboard move generation, PST/NNUE evaluation, an alpha-beta search
//! core, and a parallel perft kernel for a UCI-style chess engine.
//!
//! This crate is the engine's core only: board representation, legal move
//! generation, make/unmake, evaluation, and search. FEN/UCI text parsing is
//! limited to the thin constructors each needs internally; a full protocol
//! loop, opening book, PGN handling, and rating estimation live outside
//! this crate.

pub mod attacks;
pub mod engine;
pub mod error;
pub mod eval;
mod make_unmake;
pub mod movegen;
pub mod nnue;
pub mod perft;
pub mod position;
pub mod search;
pub mod types;
pub(crate) mod zobrist;

pub use engine::{Engine, EngineConfig, EvalSource};
pub use error::{FenError, MoveParseError, NnueError, SquareError};
pub use make_unmake::{NullMoveInfo, UnmakeInfo};
pub use position::Position;
pub use types::{Bitboard, Color, Move, MoveList, Piece, PieceKind, Square};
