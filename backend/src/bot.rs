//! Server-side move producers for `Bot` games
//!
//! A producer only picks among the moves the legality engine offers; the
//! chosen step is applied through the same [`GameSession::apply`] path as a
//! human move.

use crate::error::SessionError;
use crate::session::{Command, GameSession};
use draughts_engine::{legal_moves, Board, Color, Move, Pos};
use rand::seq::IndexedRandom;
use tracing::debug;
use web_time::Instant;

pub trait MoveProducer: Send + Sync {
    /// Pick one step for `color`, or `None` if there is nothing to play
    fn choose(&self, board: &Board, color: Color, chain: Option<Pos>) -> Option<Move>;
}

/// Uniformly random legal step
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomBot;

impl MoveProducer for RandomBot {
    fn choose(&self, board: &Board, color: Color, chain: Option<Pos>) -> Option<Move> {
        legal_moves(board, color, chain)
            .choose(&mut rand::rng())
            .copied()
    }
}

/// Always the first legal step in board order
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstLegal;

impl MoveProducer for FirstLegal {
    fn choose(&self, board: &Board, color: Color, chain: Option<Pos>) -> Option<Move> {
        legal_moves(board, color, chain).into_iter().next()
    }
}

/// Play the bot's whole turn, chain steps included. Returns the number of
/// steps applied.
pub fn play_turn(
    session: &mut GameSession,
    producer: &dyn MoveProducer,
    now: Instant,
) -> Result<usize, SessionError> {
    let Some(bot) = session.bot() else {
        return Ok(0);
    };
    let mut steps = 0;
    while !session.is_over() && session.turn() == bot {
        let Some(mv) = producer.choose(session.board(), bot, session.chain()) else {
            break;
        };
        debug!("game {}: bot plays {mv}", session.id());
        session.apply(
            Command::Move {
                mv,
                color: bot,
                expected_history_length: None,
            },
            now,
        )?;
        steps += 1;
    }
    Ok(steps)
}
