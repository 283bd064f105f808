//! Error types for the draughts engine
//!
//! Rule violations carry the short human-readable reason that is surfaced to
//! the submitter unchanged (`"wrong turn"`, `"must capture"`, ...).

use thiserror::Error;

/// Reasons the engine refuses to apply a move. Refusal never mutates a board.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("out of bounds")]
    OutOfBounds,

    #[error("no piece at source")]
    NoPiece,

    #[error("not your piece")]
    NotYourPiece,

    #[error("wrong turn")]
    WrongTurn,

    /// A capture is available somewhere and this move is not one
    #[error("must capture")]
    MustCapture,

    /// A capture chain is in progress and another piece was moved
    #[error("must continue capture")]
    MustContinueCapture,

    #[error("illegal move")]
    IllegalMove,
}

/// Errors parsing textual notation or ASCII boards
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error("invalid move: {0}")]
    InvalidMove(String),

    #[error("invalid board: {message}")]
    InvalidBoard { message: String },
}

/// Result type alias for engine operations
pub type MoveResult<T> = Result<T, MoveError>;
