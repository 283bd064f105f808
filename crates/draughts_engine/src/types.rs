//! # Draughts Core Types
//!
//! Value types shared by every layer of the engine: side colors, piece ranks,
//! board cells, square coordinates and moves.
//!
//! ## Coordinates
//!
//! Squares are addressed as `(row, col)` with `row 0` at the top of the board
//! from White's point of view. White men advance toward row 0, Black men
//! toward row 7. Only the dark squares (`(row + col) % 2 == 1`) are ever
//! occupied; nothing in the engine produces an off-parity occupancy.
//!
//! ## Wire Encoding
//!
//! Cells serialize to single-letter piece codes so snapshots stay compact:
//!
//! | Code | Piece |
//! |------|-------|
//! | `w`  | White man |
//! | `W`  | White king |
//! | `b`  | Black man |
//! | `B`  | Black king |
//! | `null` | empty |
//!
//! Positions serialize as `[row, col]` pairs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Board edge length
pub const BOARD_SIZE: i8 = 8;

/// The four diagonal unit steps, as `(d_row, d_col)`
pub const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Side color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row delta of a man's forward step
    pub fn forward(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// Row on which a man of this color is promoted
    pub fn promotion_row(self) -> i8 {
        match self {
            Color::White => 0,
            Color::Black => BOARD_SIZE - 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Piece rank. A king never reverts to a man.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Man,
    King,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub rank: Rank,
}

impl Piece {
    pub const fn man(color: Color) -> Self {
        Piece {
            color,
            rank: Rank::Man,
        }
    }

    pub const fn king(color: Color) -> Self {
        Piece {
            color,
            rank: Rank::King,
        }
    }

    pub fn is_king(self) -> bool {
        self.rank == Rank::King
    }

    pub fn promoted(self) -> Piece {
        Piece::king(self.color)
    }

    pub fn code(self) -> char {
        match (self.color, self.rank) {
            (Color::White, Rank::Man) => 'w',
            (Color::White, Rank::King) => 'W',
            (Color::Black, Rank::Man) => 'b',
            (Color::Black, Rank::King) => 'B',
        }
    }

    pub fn from_code(code: char) -> Option<Piece> {
        match code {
            'w' => Some(Piece::man(Color::White)),
            'W' => Some(Piece::king(Color::White)),
            'b' => Some(Piece::man(Color::Black)),
            'B' => Some(Piece::king(Color::Black)),
            _ => None,
        }
    }
}

/// Content of one board square
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Option<char>", into = "Option<char>")]
pub enum Cell {
    #[default]
    Empty,
    Occupied(Piece),
}

impl Cell {
    pub fn piece(self) -> Option<Piece> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(piece) => Some(piece),
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<Cell> for Option<char> {
    fn from(cell: Cell) -> Self {
        cell.piece().map(Piece::code)
    }
}

impl TryFrom<Option<char>> for Cell {
    type Error = String;

    fn try_from(code: Option<char>) -> Result<Self, Self::Error> {
        match code {
            None => Ok(Cell::Empty),
            Some(c) => Piece::from_code(c)
                .map(Cell::Occupied)
                .ok_or_else(|| format!("unknown piece code '{c}'")),
        }
    }
}

/// A square coordinate. May be out of bounds until checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i8, i8)", into = "(i8, i8)")]
pub struct Pos {
    pub row: i8,
    pub col: i8,
}

impl Pos {
    pub const fn new(row: i8, col: i8) -> Self {
        Pos { row, col }
    }

    pub fn in_bounds(self) -> bool {
        (0..BOARD_SIZE).contains(&self.row) && (0..BOARD_SIZE).contains(&self.col)
    }

    /// Dark (playable) square
    pub fn is_playable(self) -> bool {
        (self.row + self.col).rem_euclid(2) == 1
    }

    /// Step by `(d_row, d_col)`; `None` when the result leaves the board
    pub fn offset(self, d_row: i8, d_col: i8) -> Option<Pos> {
        let next = Pos::new(self.row + d_row, self.col + d_col);
        next.in_bounds().then_some(next)
    }
}

impl From<(i8, i8)> for Pos {
    fn from((row, col): (i8, i8)) -> Self {
        Pos::new(row, col)
    }
}

impl From<Pos> for (i8, i8) {
    fn from(pos: Pos) -> Self {
        (pos.row, pos.col)
    }
}

/// A single step: one simple move or one jump of a capture chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Pos,
    pub to: Pos,
}

impl Move {
    pub const fn new(from: Pos, to: Pos) -> Self {
        Move { from, to }
    }

    /// Unit step along the move's diagonal, if it is diagonal at all
    pub fn direction(self) -> Option<(i8, i8)> {
        let d_row = self.to.row - self.from.row;
        let d_col = self.to.col - self.from.col;
        if d_row == 0 || d_row.abs() != d_col.abs() {
            return None;
        }
        Some((d_row.signum(), d_col.signum()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_codes_match_wire_format() {
        for code in ['w', 'W', 'b', 'B'] {
            let piece = Piece::from_code(code).expect("known code");
            assert_eq!(piece.code(), code);
        }
        assert_eq!(Piece::from_code('x'), None);
    }

    #[test]
    fn test_cell_serializes_as_piece_code() {
        let cells = [Cell::Empty, Cell::Occupied(Piece::king(Color::Black))];
        let json = serde_json::to_string(&cells).expect("Should serialize");
        assert_eq!(json, r#"[null,"B"]"#);

        let bad: Result<Cell, _> = serde_json::from_str(r#""q""#);
        assert!(bad.is_err(), "Unknown code must be rejected");
    }

    #[test]
    fn test_pos_parity_and_bounds() {
        assert!(Pos::new(2, 1).is_playable());
        assert!(!Pos::new(2, 2).is_playable());
        assert!(!Pos::new(-1, 0).in_bounds());
        assert_eq!(Pos::new(0, 0).offset(-1, 1), None);
        assert_eq!(Pos::new(3, 3).offset(1, 1), Some(Pos::new(4, 4)));
    }

    fn mv(from: (i8, i8), to: (i8, i8)) -> Move {
        Move::new(from.into(), to.into())
    }

    #[test]
    fn test_move_direction_rejects_non_diagonal() {
        assert_eq!(mv((5, 0), (4, 1)).direction(), Some((-1, 1)));
        assert_eq!(mv((5, 0), (5, 2)).direction(), None);
        assert_eq!(mv((5, 0), (3, 1)).direction(), None);
    }
}
