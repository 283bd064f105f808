//! Flying king move generation
//!
//! ## King Movement Rules
//!
//! - A king slides any number of empty squares along each of the four
//!   diagonals until blocked by a piece or the edge.
//! - To capture, the king slides through empty squares; if the first piece it
//!   meets is an opponent's and the square right behind it is empty, every
//!   consecutive empty square behind that piece is a landing square.
//! - A king never jumps two pieces at once on one diagonal and never jumps or
//!   lands on its own piece.

use crate::board::Board;
use crate::types::*;

pub(super) fn slides(board: &Board, from: Pos) -> Vec<Pos> {
    let mut moves = Vec::new();
    for (d_row, d_col) in DIAGONALS {
        let mut cursor = from.offset(d_row, d_col);
        while let Some(square) = cursor.filter(|sq| board.is_empty(*sq)) {
            moves.push(square);
            cursor = square.offset(d_row, d_col);
        }
    }
    moves
}

pub(super) fn captures(board: &Board, from: Pos, color: Color) -> Vec<Pos> {
    let mut landings = Vec::new();
    for (d_row, d_col) in DIAGONALS {
        // Slide to the first occupied square
        let mut cursor = from.offset(d_row, d_col);
        while let Some(square) = cursor.filter(|sq| board.is_empty(*sq)) {
            cursor = square.offset(d_row, d_col);
        }
        let Some(blocker) = cursor else { continue };
        match board.piece_at(blocker) {
            Some(piece) if piece.color != color => {}
            _ => continue,
        }
        let mut beyond = blocker.offset(d_row, d_col);
        while let Some(square) = beyond.filter(|sq| board.is_empty(*sq)) {
            landings.push(square);
            beyond = square.offset(d_row, d_col);
        }
    }
    landings
}
