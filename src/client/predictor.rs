//! Optimistic local view of a game
//!
//! The predictor applies the local player's moves immediately so the board
//! reacts without a round trip. It never decides anything: every
//! authoritative snapshot replaces its base state, and pending moves survive
//! only while the server's history still agrees with them.

use draughts_engine::{legal_destinations, resolve, Board, Color, Move, MoveResult, Pos};
use shared::{MoveRequest, SessionSnapshot};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Predictor {
    confirmed: SessionSnapshot,
    /// Moves sent but not yet seen in an authoritative history
    pending: Vec<Move>,
    board: Board,
    turn: Color,
    chain: Option<Pos>,
}

impl Predictor {
    pub fn new(snapshot: SessionSnapshot) -> Self {
        Self {
            board: snapshot.board,
            turn: snapshot.turn,
            chain: snapshot.chain,
            confirmed: snapshot,
            pending: Vec::new(),
        }
    }

    /// Last snapshot received from the server
    pub fn confirmed(&self) -> &SessionSnapshot {
        &self.confirmed
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn chain(&self) -> Option<Pos> {
        self.chain
    }

    pub fn pending(&self) -> &[Move] {
        &self.pending
    }

    pub fn destinations(&self, from: Pos, color: Color) -> Vec<Pos> {
        if self.confirmed.is_over() {
            return Vec::new();
        }
        let chain = (color == self.turn).then_some(self.chain).flatten();
        legal_destinations(&self.board, from, color, chain)
    }

    /// Apply `mv` locally and return the request to send
    pub fn predict(&mut self, mv: Move, color: Color) -> MoveResult<MoveRequest> {
        if color != self.turn {
            return Err(draughts_engine::MoveError::WrongTurn);
        }
        let expected = self.confirmed.history.len() + self.pending.len();
        self.step(mv, color)?;
        self.pending.push(mv);
        Ok(MoveRequest {
            from: mv.from,
            to: mv.to,
            color,
            expected_history_length: Some(expected),
        })
    }

    fn step(&mut self, mv: Move, color: Color) -> MoveResult<()> {
        let resolution = resolve(&self.board, mv, color, self.chain)?;
        self.board = resolution.board;
        if resolution.continuation.ends_turn() {
            self.turn = color.opponent();
            self.chain = None;
        } else {
            self.chain = Some(mv.to);
        }
        Ok(())
    }

    /// Take an authoritative snapshot, keeping only predictions it has not
    /// contradicted
    pub fn reconcile(&mut self, snapshot: SessionSnapshot) {
        let base = self.confirmed.history.len();
        let mut pending = std::mem::take(&mut self.pending);
        let seen = snapshot.history.get(base..).unwrap_or_default();

        let confirmed = pending
            .iter()
            .zip(seen)
            .take_while(|(mv, notation)| mv.to_string() == **notation)
            .count();
        if confirmed < seen.len().min(pending.len()) || snapshot.history.len() < base {
            debug!("server history diverged, dropping {} prediction(s)", pending.len());
            pending.clear();
        } else if seen.len() > confirmed {
            // Server moved past our predictions (opponent or auto-play)
            pending.clear();
        } else {
            pending.drain(..confirmed);
        }

        self.board = snapshot.board;
        self.turn = snapshot.turn;
        self.chain = snapshot.chain;
        self.confirmed = snapshot;

        if self.confirmed.is_over() {
            return;
        }
        for mv in pending {
            let color = self.turn;
            if self.step(mv, color).is_err() {
                debug!("prediction {mv} no longer legal, discarding the rest");
                self.board = self.confirmed.board;
                self.turn = self.confirmed.turn;
                self.chain = self.confirmed.chain;
                self.pending.clear();
                return;
            }
            self.pending.push(mv);
        }
    }
}
