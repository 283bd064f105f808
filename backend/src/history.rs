//! Append-only move log with a board snapshot per ply
//!
//! Index 0 is the starting position; index `k` is the board right after the
//! `k`-th applied step. Lookups never re-run the rules.

use draughts_engine::{Board, Color, Move};
use shared::PlySnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ply {
    pub notation: String,
    pub color: Color,
    pub board: Board,
}

#[derive(Debug, Clone)]
pub struct History {
    initial: Board,
    plies: Vec<Ply>,
}

impl History {
    pub fn new(initial: Board) -> Self {
        Self {
            initial,
            plies: Vec::new(),
        }
    }

    pub fn push(&mut self, mv: Move, color: Color, board: Board) {
        self.plies.push(Ply {
            notation: mv.to_string(),
            color,
            board,
        });
    }

    pub fn len(&self) -> usize {
        self.plies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }

    pub fn notation(&self) -> Vec<String> {
        self.plies.iter().map(|ply| ply.notation.clone()).collect()
    }

    /// Board at `index` (0 = start), `None` past the last ply
    pub fn board_at(&self, index: usize) -> Option<&Board> {
        match index {
            0 => Some(&self.initial),
            n => self.plies.get(n - 1).map(|ply| &ply.board),
        }
    }

    /// The ply that produced the board at `index`
    pub fn ply(&self, index: usize) -> Option<&Ply> {
        index.checked_sub(1).and_then(|i| self.plies.get(i))
    }

    pub fn latest(&self) -> &Board {
        self.plies.last().map_or(&self.initial, |ply| &ply.board)
    }

    pub fn ply_snapshot(&self, index: usize) -> Option<PlySnapshot> {
        Some(PlySnapshot {
            index,
            board: *self.board_at(index)?,
            notation: self.ply(index).map(|ply| ply.notation.clone()),
            total: self.len(),
        })
    }

    /// Every board from the start position to the latest ply
    pub fn boards(&self) -> Vec<Board> {
        std::iter::once(self.initial)
            .chain(self.plies.iter().map(|ply| ply.board))
            .collect()
    }
}
