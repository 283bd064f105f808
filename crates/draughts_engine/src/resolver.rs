//! # Move Resolver
//!
//! Applies exactly one step (a simple move or one jump of a capture chain) to
//! a board and reports what happened. Chains are driven by the caller as an
//! explicit loop:
//!
//! ```text
//! resolve step ─► Continuation::TurnEnds      → flip turn
//!              ├► Continuation::Forced(next)  → apply `next` (single option)
//!              └► Continuation::Choice(opts)  → wait for the mover's choice
//! ```
//!
//! The resolver holds no chain state itself; the game session stores the
//! square of the capturing piece and passes it back in as `chain`.

use crate::board::Board;
use crate::error::{MoveError, MoveResult};
use crate::move_gen::{capture_moves, captured_square, forced_pieces, simple_moves};
use crate::types::*;

/// What the mover must do after a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// No further capture; the turn passes
    TurnEnds,
    /// Exactly one further capture; it is mandatory
    Forced(Move),
    /// Several further captures; the mover picks one
    Choice(Vec<Pos>),
}

impl Continuation {
    pub fn ends_turn(&self) -> bool {
        matches!(self, Continuation::TurnEnds)
    }
}

/// Outcome of applying one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub board: Board,
    pub mv: Move,
    /// The moving piece as it stands on `mv.to`
    pub piece: Piece,
    pub captured: Option<(Pos, Piece)>,
    pub promoted: bool,
    pub continuation: Continuation,
}

impl Resolution {
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }
}

/// Check `mv` for `color` without applying it.
///
/// Returns whether the move is a capture.
pub fn validate(board: &Board, mv: Move, color: Color, chain: Option<Pos>) -> MoveResult<bool> {
    if !mv.from.in_bounds() || !mv.to.in_bounds() {
        return Err(MoveError::OutOfBounds);
    }
    let piece = board.piece_at(mv.from).ok_or(MoveError::NoPiece)?;
    if piece.color != color {
        return Err(MoveError::NotYourPiece);
    }
    if let Some(chain_pos) = chain {
        if mv.from != chain_pos {
            return Err(MoveError::MustContinueCapture);
        }
        return if capture_moves(board, mv.from).contains(&mv.to) {
            Ok(true)
        } else {
            Err(MoveError::MustContinueCapture)
        };
    }

    let captures = capture_moves(board, mv.from);
    if captures.contains(&mv.to) {
        return Ok(true);
    }
    if !forced_pieces(board, color).is_empty() {
        return Err(MoveError::MustCapture);
    }
    if simple_moves(board, mv.from).contains(&mv.to) {
        Ok(false)
    } else {
        Err(MoveError::IllegalMove)
    }
}

/// Validate and apply one step, returning the new board. `board` is untouched.
pub fn resolve(board: &Board, mv: Move, color: Color, chain: Option<Pos>) -> MoveResult<Resolution> {
    let is_capture = validate(board, mv, color, chain)?;
    let mut next = *board;
    let mut piece = next.clear(mv.from).ok_or(MoveError::NoPiece)?;

    let captured = if is_capture {
        let square = captured_square(board, mv, color).ok_or(MoveError::IllegalMove)?;
        next.clear(square).map(|victim| (square, victim))
    } else {
        None
    };

    let promoted = !piece.is_king() && mv.to.row == color.promotion_row();
    if promoted {
        piece = piece.promoted();
    }
    next.place(mv.to, piece);

    // A promoted man continues the chain as a king
    let continuation = if captured.is_some() {
        let mut options = capture_moves(&next, mv.to);
        match options.len() {
            0 => Continuation::TurnEnds,
            1 => Continuation::Forced(Move::new(mv.to, options.remove(0))),
            _ => Continuation::Choice(options),
        }
    } else {
        Continuation::TurnEnds
    };

    Ok(Resolution {
        board: next,
        mv,
        piece,
        captured,
        promoted,
        continuation,
    })
}
