//! Square and move notation
//!
//! Squares are written file letter + rank number from White's point of view:
//! column 0 is file `A`, row 7 is rank `1`. A move is written `C3->D4`.
//! Black-perspective displays transform coordinates for rendering only; the
//! stored notation never changes orientation.

use crate::error::NotationError;
use crate::types::{Move, Pos, BOARD_SIZE};
use std::fmt;
use std::str::FromStr;

const ARROW: &str = "->";

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'A' + self.col as u8) as char;
        write!(f, "{}{}", file, BOARD_SIZE - self.row)
    }
}

impl FromStr for Pos {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(NotationError::InvalidSquare(s.to_string()));
        };
        let file = file.to_ascii_uppercase();
        if !('A'..='H').contains(&file) || !('1'..='8').contains(&rank) {
            return Err(NotationError::InvalidSquare(s.to_string()));
        }
        let col = (file as u8 - b'A') as i8;
        let row = BOARD_SIZE - (rank as u8 - b'0') as i8;
        Ok(Pos::new(row, col))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.from, ARROW, self.to)
    }
}

impl FromStr for Move {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once(ARROW)
            .ok_or_else(|| NotationError::InvalidMove(s.to_string()))?;
        Ok(Move::new(from.parse()?, to.parse()?))
    }
}
