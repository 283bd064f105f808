//! # Legality Engine
//!
//! Pure functions answering "where may this piece go?" for a given board.
//! Nothing in this module mutates its input.
//!
//! ## Rules
//!
//! - **Men** step one square diagonally forward and capture by jumping an
//!   adjacent opponent piece in any of the four diagonal directions.
//! - **Kings** fly: they slide any distance along a diagonal and capture the
//!   first piece met if it belongs to the opponent, landing on any empty
//!   square beyond it (see [`king`]).
//! - **Captures are mandatory.** When any piece of the side to move can
//!   capture, only captures by those pieces are playable
//!   ([`forced_pieces`]).
//! - **Chains.** While a capture chain is in progress only the capturing
//!   piece may move, and only by capturing again.
//!
//! ## Module Structure
//!
//! - `man` - step and jump generation for men
//! - `king` - flying-king slides and captures

mod king;
mod man;


use crate::board::Board;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// A piece of the side to move that has at least one capture available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedPiece {
    pub pos: Pos,
    pub landings: Vec<Pos>,
}

/// Non-capturing destinations for the piece at `pos` (empty if no piece)
pub fn simple_moves(board: &Board, pos: Pos) -> Vec<Pos> {
    match board.piece_at(pos) {
        Some(piece) if piece.is_king() => king::slides(board, pos),
        Some(piece) => man::steps(board, pos, piece.color),
        None => Vec::new(),
    }
}

/// Capture landing squares for the piece at `pos` (empty if no piece)
pub fn capture_moves(board: &Board, pos: Pos) -> Vec<Pos> {
    match board.piece_at(pos) {
        Some(piece) if piece.is_king() => king::captures(board, pos, piece.color),
        Some(piece) => man::jumps(board, pos, piece.color),
        None => Vec::new(),
    }
}

/// Every piece of `color` with a capture available, in row-major order
pub fn forced_pieces(board: &Board, color: Color) -> Vec<ForcedPiece> {
    board
        .pieces_of(color)
        .filter_map(|(pos, _)| {
            let landings = capture_moves(board, pos);
            (!landings.is_empty()).then_some(ForcedPiece { pos, landings })
        })
        .collect()
}

/// The single playable capture, when exactly one piece can capture and it
/// has exactly one landing square
pub fn sole_forced_capture(forced: &[ForcedPiece]) -> Option<Move> {
    match forced {
        [only] if only.landings.len() == 1 => Some(Move::new(only.pos, only.landings[0])),
        _ => None,
    }
}

/// Playable destinations for the piece at `pos` when `color` is to move.
///
/// Accounts for forced captures and for an in-progress chain (`chain` is the
/// square of the capturing piece). Returns nothing for opponent pieces.
pub fn legal_destinations(board: &Board, pos: Pos, color: Color, chain: Option<Pos>) -> Vec<Pos> {
    match board.piece_at(pos) {
        Some(piece) if piece.color == color => {}
        _ => return Vec::new(),
    }
    if let Some(chain_pos) = chain {
        return if chain_pos == pos {
            capture_moves(board, pos)
        } else {
            Vec::new()
        };
    }
    let captures = capture_moves(board, pos);
    if !captures.is_empty() {
        return captures;
    }
    if has_any_capture(board, color) {
        return Vec::new();
    }
    simple_moves(board, pos)
}

/// All playable steps for `color`
pub fn legal_moves(board: &Board, color: Color, chain: Option<Pos>) -> Vec<Move> {
    if let Some(pos) = chain {
        return capture_moves(board, pos)
            .into_iter()
            .map(|to| Move::new(pos, to))
            .collect();
    }
    let forced = forced_pieces(board, color);
    if !forced.is_empty() {
        return forced
            .into_iter()
            .flat_map(|fp| fp.landings.into_iter().map(move |to| Move::new(fp.pos, to)))
            .collect();
    }
    board
        .pieces_of(color)
        .flat_map(|(pos, _)| {
            simple_moves(board, pos)
                .into_iter()
                .map(move |to| Move::new(pos, to))
        })
        .collect()
}

pub fn has_any_capture(board: &Board, color: Color) -> bool {
    board
        .pieces_of(color)
        .any(|(pos, _)| !capture_moves(board, pos).is_empty())
}

/// Whether `color` has any move or capture at all
pub fn has_legal_move(board: &Board, color: Color) -> bool {
    board.pieces_of(color).any(|(pos, _)| {
        !simple_moves(board, pos).is_empty() || !capture_moves(board, pos).is_empty()
    })
}

/// Square of the opponent piece jumped by `mv`, if `mv` is a capture
pub fn captured_square(board: &Board, mv: Move, color: Color) -> Option<Pos> {
    let (d_row, d_col) = mv.direction()?;
    let mut square = mv.from.offset(d_row, d_col)?;
    while square != mv.to {
        if let Some(piece) = board.piece_at(square) {
            return (piece.color != color).then_some(square);
        }
        square = square.offset(d_row, d_col)?;
    }
    None
}
