//! Russian draughts (8×8) rules engine
//!
//! Pure, synchronous rule logic shared by the game server and by clients that
//! want to predict moves locally:
//!
//! - [`board`] - the 8×8 board model
//! - [`move_gen`] - legality engine (simple moves, captures, forced captures)
//! - [`resolver`] - applies one step and reports chain continuations
//! - [`outcome`] - status/reason types and end-condition evaluation
//! - [`notation`] - `C3->D4` square and move notation

pub mod board;
pub mod error;
pub mod move_gen;
pub mod notation;
pub mod outcome;
pub mod resolver;
pub mod types;

pub use board::Board;
pub use error::{MoveError, MoveResult, NotationError};
pub use move_gen::{
    capture_moves, forced_pieces, legal_destinations, legal_moves, simple_moves,
    sole_forced_capture, ForcedPiece,
};
pub use outcome::{evaluate, Outcome, Reason, Status};
pub use resolver::{resolve, validate, Continuation, Resolution};
pub use types::{Cell, Color, Move, Piece, Pos, Rank};
