//! Man move generation
//!
//! Men step one square diagonally toward the opponent's side and capture by
//! jumping an adjacent opponent piece, forward or backward.

use crate::board::Board;
use crate::types::*;

/// Forward diagonal steps onto empty squares
pub(super) fn steps(board: &Board, from: Pos, color: Color) -> Vec<Pos> {
    let forward = color.forward();
    [-1, 1]
        .into_iter()
        .filter_map(|d_col| from.offset(forward, d_col))
        .filter(|to| board.is_empty(*to))
        .collect()
}

/// Two-square jumps over an adjacent opponent piece onto an empty square
pub(super) fn jumps(board: &Board, from: Pos, color: Color) -> Vec<Pos> {
    DIAGONALS
        .into_iter()
        .filter_map(|(d_row, d_col)| {
            let over = from.offset(d_row, d_col)?;
            let landing = over.offset(d_row, d_col)?;
            let jumped = board.piece_at(over)?;
            (jumped.color != color && board.is_empty(landing)).then_some(landing)
        })
        .collect()
}
