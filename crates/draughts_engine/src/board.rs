//! Board model
//!
//! An 8×8 grid of [`Cell`]s. The board is a plain `Copy` value: the legality
//! engine reads it, the resolver returns a fresh one, and nothing here holds
//! interior mutability.

use crate::error::NotationError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::fmt;

const SIZE: usize = BOARD_SIZE as usize;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; SIZE]; SIZE],
}

impl Board {
    pub fn empty() -> Self {
        Board {
            cells: [[Cell::Empty; SIZE]; SIZE],
        }
    }

    /// Standard starting position: Black men on rows 0-2, White men on rows 5-7
    pub fn initial() -> Self {
        let mut board = Board::empty();
        for row in 0..BOARD_SIZE {
            let color = match row {
                0..=2 => Color::Black,
                5..=7 => Color::White,
                _ => continue,
            };
            for col in 0..BOARD_SIZE {
                let pos = Pos::new(row, col);
                if pos.is_playable() {
                    board.place(pos, Piece::man(color));
                }
            }
        }
        board
    }

    /// Parse an ASCII diagram, one string per row from row 0.
    ///
    /// `.` or space is empty, otherwise a piece code (`w`, `W`, `b`, `B`).
    ///
    /// ```
    /// use draughts_engine::Board;
    /// let board = Board::from_ascii(&[
    ///     "........",
    ///     "........",
    ///     "....w...",
    ///     ".....b..",
    ///     "........",
    ///     "........",
    ///     "........",
    ///     "........",
    /// ]).unwrap();
    /// assert_eq!(board.total_pieces(), 2);
    /// ```
    pub fn from_ascii(rows: &[&str]) -> Result<Self, NotationError> {
        if rows.len() != SIZE {
            return Err(NotationError::InvalidBoard {
                message: format!("expected {SIZE} rows, got {}", rows.len()),
            });
        }
        let mut board = Board::empty();
        for (row, line) in rows.iter().enumerate() {
            let chars: Vec<char> = line.chars().collect();
            if chars.len() != SIZE {
                return Err(NotationError::InvalidBoard {
                    message: format!("row {row} has {} squares", chars.len()),
                });
            }
            for (col, ch) in chars.into_iter().enumerate() {
                if ch == '.' || ch == ' ' {
                    continue;
                }
                let piece = Piece::from_code(ch).ok_or_else(|| NotationError::InvalidBoard {
                    message: format!("unknown piece '{ch}' at row {row} col {col}"),
                })?;
                board.place(Pos::new(row as i8, col as i8), piece);
            }
        }
        Ok(board)
    }

    /// Cell at `pos`; off-board squares read as empty
    pub fn get(&self, pos: Pos) -> Cell {
        if !pos.in_bounds() {
            return Cell::Empty;
        }
        self.cells[pos.row as usize][pos.col as usize]
    }

    pub fn piece_at(&self, pos: Pos) -> Option<Piece> {
        self.get(pos).piece()
    }

    /// On-board and unoccupied
    pub fn is_empty(&self, pos: Pos) -> bool {
        pos.in_bounds() && self.get(pos).is_empty()
    }

    pub fn place(&mut self, pos: Pos, piece: Piece) {
        self.set(pos, Cell::Occupied(piece));
    }

    pub fn clear(&mut self, pos: Pos) -> Option<Piece> {
        let previous = self.piece_at(pos);
        self.set(pos, Cell::Empty);
        previous
    }

    fn set(&mut self, pos: Pos, cell: Cell) {
        if pos.in_bounds() {
            self.cells[pos.row as usize][pos.col as usize] = cell;
        }
    }

    /// All occupied squares in row-major order
    pub fn pieces(&self) -> impl Iterator<Item = (Pos, Piece)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, cell)| {
                cell.piece()
                    .map(|piece| (Pos::new(row as i8, col as i8), piece))
            })
        })
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Pos, Piece)> + '_ {
        self.pieces().filter(move |(_, piece)| piece.color == color)
    }

    pub fn count(&self, color: Color) -> usize {
        self.pieces_of(color).count()
    }

    pub fn total_pieces(&self) -> usize {
        self.pieces().count()
    }

    pub fn only_kings(&self) -> bool {
        self.pieces().all(|(_, piece)| piece.is_king())
    }

    pub fn rows(&self) -> &[[Cell; SIZE]; SIZE] {
        &self.cells
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::initial()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for row in &self.cells {
            let line: String = row
                .iter()
                .map(|cell| cell.piece().map_or('.', Piece::code))
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
