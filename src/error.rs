//! Error types for the engine core.
//!
//! Each concern gets its own error enum rather than one catch-all type,
//! matching how parse failures, illegal moves, and NNUE loading are
//! distinct recovery situations for a caller.

use std::fmt;

/// Error type for FEN parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// FEN string has too few whitespace-separated fields (needs at least 4).
    TooFewParts { found: usize },
    /// Invalid piece character in the placement field.
    InvalidPiece { char: char },
    /// Invalid castling character.
    InvalidCastling { char: char },
    /// Invalid side to move (must be 'w' or 'b').
    InvalidSideToMove { found: String },
    /// Invalid en-passant target square.
    InvalidEnPassant { found: String },
    /// A rank in the placement field does not sum to 8 files.
    InvalidRank { rank: usize },
    /// Too many files packed into a rank.
    TooManyFiles { rank: usize, files: usize },
    /// Halfmove clock or fullmove number field is not a valid integer.
    InvalidCounter { found: String },
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::TooFewParts { found } => {
                write!(f, "FEN must have at least 4 fields, found {found}")
            }
            FenError::InvalidPiece { char } => write!(f, "invalid piece character '{char}' in FEN"),
            FenError::InvalidCastling { char } => {
                write!(f, "invalid castling character '{char}' in FEN")
            }
            FenError::InvalidSideToMove { found } => {
                write!(f, "invalid side to move '{found}', expected 'w' or 'b'")
            }
            FenError::InvalidEnPassant { found } => write!(f, "invalid en-passant square '{found}'"),
            FenError::InvalidRank { rank } => write!(f, "rank {rank} does not span 8 files"),
            FenError::TooManyFiles { rank, files } => {
                write!(f, "too many files ({files}) in rank {rank}")
            }
            FenError::InvalidCounter { found } => write!(f, "invalid move counter '{found}'"),
        }
    }
}

impl std::error::Error for FenError {}

/// Error type for UCI move-string parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    /// Move string has invalid length (must be 4 or 5 characters).
    InvalidLength { len: usize },
    /// Invalid square notation within the move string.
    InvalidSquare { notation: String },
    /// Invalid promotion piece character.
    InvalidPromotion { char: char },
    /// Move is syntactically valid but not legal in the given position.
    IllegalMove { notation: String },
}

impl fmt::Display for MoveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveParseError::InvalidLength { len } => {
                write!(f, "UCI move must be 4-5 characters, found {len}")
            }
            MoveParseError::InvalidSquare { notation } => {
                write!(f, "invalid square notation in '{notation}'")
            }
            MoveParseError::InvalidPromotion { char } => {
                write!(f, "invalid promotion piece '{char}'")
            }
            MoveParseError::IllegalMove { notation } => write!(f, "illegal move '{notation}'"),
        }
    }
}

impl std::error::Error for MoveParseError {}

/// Error type for square parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SquareError {
    RankOutOfBounds { rank: usize },
    FileOutOfBounds { file: usize },
    InvalidNotation { notation: String },
}

impl fmt::Display for SquareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SquareError::RankOutOfBounds { rank } => write!(f, "rank {rank} out of bounds (0-7)"),
            SquareError::FileOutOfBounds { file } => write!(f, "file {file} out of bounds (0-7)"),
            SquareError::InvalidNotation { notation } => {
                write!(f, "invalid square notation '{notation}'")
            }
        }
    }
}

impl std::error::Error for SquareError {}

/// Error type for loading an NNUE network file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NnueError {
    /// The file could not be opened or read to completion.
    Io { message: String },
    /// File is shorter than the declared section lengths require.
    Truncated { expected_at_least: usize, found: usize },
    /// Version word did not match the format this crate understands.
    WrongVersion { found: u32 },
    /// Combined input-transform/network hash did not match.
    WrongHash { found: u32, expected: u32 },
}

impl fmt::Display for NnueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NnueError::Io { message } => write!(f, "NNUE file I/O error: {message}"),
            NnueError::Truncated { expected_at_least, found } => write!(
                f,
                "NNUE file truncated: expected at least {expected_at_least} bytes, found {found}"
            ),
            NnueError::WrongVersion { found } => {
                write!(f, "unsupported NNUE version word 0x{found:08x}")
            }
            NnueError::WrongHash { found, expected } => write!(
                f,
                "NNUE hash mismatch: file has 0x{found:08x}, expected 0x{expected:08x}"
            ),
        }
    }
}

impl std::error::Error for NnueError {}
