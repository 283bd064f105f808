//! Game status and end-condition evaluation
//!
//! ```text
//! Ongoing → WhiteWin / BlackWin / Draw
//! ```
//!
//! All non-`Ongoing` states are terminal.

use crate::board::Board;
use crate::move_gen::{has_any_capture, has_legal_move};
use crate::types::Color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Ongoing,
    WhiteWin,
    BlackWin,
    Draw,
}

impl Status {
    pub fn win_for(color: Color) -> Status {
        match color {
            Color::White => Status::WhiteWin,
            Color::Black => Status::BlackWin,
        }
    }

    pub fn is_over(self) -> bool {
        self != Status::Ongoing
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            Status::WhiteWin => Some(Color::White),
            Status::BlackWin => Some(Color::Black),
            Status::Ongoing | Status::Draw => None,
        }
    }
}

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    NoPieces,
    NoMoves,
    Resign,
    Timeout,
    Agreement,
    /// Only kings remain and nobody can capture
    OnlyKings,
}

/// A terminal result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: Status,
    pub reason: Reason,
}

impl Outcome {
    pub fn win(color: Color, reason: Reason) -> Self {
        Outcome {
            status: Status::win_for(color),
            reason,
        }
    }

    pub fn draw(reason: Reason) -> Self {
        Outcome {
            status: Status::Draw,
            reason,
        }
    }
}

/// Evaluate the board after `mover` has finished a turn and `mover`'s
/// opponent is about to move.
pub fn evaluate(board: &Board, mover: Color, kings_only_draw: bool) -> Option<Outcome> {
    let to_move = mover.opponent();
    if board.count(to_move) == 0 {
        return Some(Outcome::win(mover, Reason::NoPieces));
    }
    if !has_legal_move(board, to_move) {
        return Some(Outcome::win(mover, Reason::NoMoves));
    }
    if kings_only_draw
        && board.only_kings()
        && !has_any_capture(board, Color::White)
        && !has_any_capture(board, Color::Black)
    {
        return Some(Outcome::draw(Reason::OnlyKings));
    }
    None
}
