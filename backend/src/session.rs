//! # Game Session
//!
//! The mutable aggregate of one game and the only place its board changes.
//! Every write arrives as a [`Command`] through [`GameSession::apply`]:
//!
//! ```text
//!              ┌──────── Move / OfferDraw / RespondDraw ────────┐
//!              ▼                                                │
//!          Ongoing ──► WhiteWin | BlackWin | Draw   (terminal) ─┘
//!              │ Resign, Timeout, NoPieces, NoMoves,
//!              │ Agreement, OnlyKings
//!              ▼
//!   finished: RequestRematch / RespondRematch ─► Notice::StartRematch
//! ```
//!
//! A capture chain is tracked as the square of the capturing piece. While it
//! is set the turn does not pass and only that piece may move. Continuations
//! are applied in a loop, never by recursion.
//!
//! Rejections leave the session untouched. The one exception is a move
//! submitted after the mover's clock ran out: the session first records the
//! timeout, then refuses the move with [`SessionError::TimeExpired`].

use crate::clock::Clock;
use crate::config::RulePolicy;
use crate::error::SessionError;
use crate::history::History;
use chrono::{DateTime, Utc};
use draughts_engine::{
    evaluate, forced_pieces, resolve, sole_forced_capture, Board, Color, Continuation, Move,
    MoveError, Outcome, Pos, Reason, Status,
};
use shared::{
    GameId, GameMode, MoveRequest, Players, PlySnapshot, RatingChange, RecordedGame,
    SessionSnapshot,
};
use std::time::Duration;
use tracing::{debug, info};
use web_time::Instant;

/// A write against one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move {
        mv: Move,
        color: Color,
        expected_history_length: Option<usize>,
    },
    Resign { color: Color },
    OfferDraw { color: Color },
    RespondDraw { color: Color, accept: bool },
    CheckTimeout,
    RequestRematch { color: Color },
    RespondRematch { color: Color, accept: bool },
}

impl Command {
    /// The color issuing the command, if any
    pub fn actor(&self) -> Option<Color> {
        match *self {
            Command::Move { color, .. }
            | Command::Resign { color }
            | Command::OfferDraw { color }
            | Command::RespondDraw { color, .. }
            | Command::RequestRematch { color }
            | Command::RespondRematch { color, .. } => Some(color),
            Command::CheckTimeout => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Move { .. } => "move",
            Command::Resign { .. } => "resign",
            Command::OfferDraw { .. } => "offer_draw",
            Command::RespondDraw { .. } => "respond_draw",
            Command::CheckTimeout => "check_timeout",
            Command::RequestRematch { .. } => "request_rematch",
            Command::RespondRematch { .. } => "respond_rematch",
        }
    }
}

impl From<MoveRequest> for Command {
    fn from(req: MoveRequest) -> Self {
        Command::Move {
            mv: Move::new(req.from, req.to),
            color: req.color,
            expected_history_length: req.expected_history_length,
        }
    }
}

/// Out-of-band result of a command, published next to the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    DrawOffered(Color),
    DrawDeclined(Color),
    RematchOffered(Color),
    RematchDeclined(Color),
    /// Both sides want a rematch; the directory allocates the new session
    StartRematch,
}

/// Everything needed to start a session
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub id: GameId,
    pub mode: GameMode,
    pub players: Players,
    pub clock: Duration,
    pub policy: RulePolicy,
    /// Color played by the server's move producer
    pub bot: Option<Color>,
    pub board: Board,
    pub turn: Color,
}

impl SessionSetup {
    pub fn new(id: GameId, mode: GameMode, players: Players) -> Self {
        Self {
            id,
            mode,
            players,
            clock: Duration::from_secs(600),
            policy: RulePolicy::default(),
            bot: None,
            board: Board::initial(),
            turn: Color::White,
        }
    }

    /// Same participants with colors swapped
    pub fn rematch_of(session: &GameSession, id: GameId) -> Self {
        Self {
            id,
            mode: session.mode,
            players: session.players.swapped(),
            clock: session.budget,
            policy: session.policy,
            bot: session.bot.map(Color::opponent),
            board: Board::initial(),
            turn: Color::White,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameSession {
    id: GameId,
    mode: GameMode,
    players: Players,
    policy: RulePolicy,
    bot: Option<Color>,
    budget: Duration,

    board: Board,
    turn: Color,
    chain: Option<Pos>,
    clock: Clock,
    history: History,

    status: Status,
    reason: Option<Reason>,
    draw_offer: Option<Color>,
    rematch_offer: Option<Color>,
    rematch_game: Option<GameId>,
    rating_change: Option<RatingChange>,
    finished_at: Option<Instant>,

    /// Bumped on every state change
    version: u64,
}

impl GameSession {
    pub fn new(setup: SessionSetup, now: Instant) -> Self {
        let mut clock = Clock::new(setup.clock, now);
        if setup.turn == Color::Black {
            clock.switch(Color::Black, now);
        }
        Self {
            id: setup.id,
            mode: setup.mode,
            players: setup.players,
            policy: setup.policy,
            bot: setup.bot,
            budget: setup.clock,
            board: setup.board,
            turn: setup.turn,
            chain: None,
            clock,
            history: History::new(setup.board),
            status: Status::Ongoing,
            reason: None,
            draw_offer: None,
            rematch_offer: None,
            rematch_game: None,
            rating_change: None,
            finished_at: None,
            version: 0,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn players(&self) -> &Players {
        &self.players
    }

    pub fn bot(&self) -> Option<Color> {
        self.bot
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

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status.is_over()
    }

    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at
    }

    pub fn rematch_game(&self) -> Option<GameId> {
        self.rematch_game
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_rematch_game(&mut self, id: GameId) {
        self.rematch_game = Some(id);
        self.rematch_offer = None;
        self.version += 1;
    }

    pub fn set_rating_change(&mut self, change: RatingChange) {
        self.rating_change = Some(change);
        self.version += 1;
    }

    /// Single dispatch point for every write
    pub fn apply(&mut self, command: Command, now: Instant) -> Result<Option<Notice>, SessionError> {
        match command {
            Command::Move {
                mv,
                color,
                expected_history_length,
            } => self
                .submit_move(mv, color, expected_history_length, now)
                .map(|()| None),
            Command::Resign { color } => {
                self.ensure_ongoing()?;
                info!("game {}: {color} resigns", self.id);
                self.finish(Outcome::win(color.opponent(), Reason::Resign), now);
                Ok(None)
            }
            Command::OfferDraw { color } => self.offer_draw(color, now),
            Command::RespondDraw { color, accept } => self.respond_draw(color, accept, now),
            Command::CheckTimeout => {
                self.check_timeout(now);
                Ok(None)
            }
            Command::RequestRematch { color } => self.request_rematch(color),
            Command::RespondRematch { color, accept } => self.respond_rematch(color, accept),
        }
    }

    fn ensure_ongoing(&self) -> Result<(), SessionError> {
        if self.is_over() {
            Err(SessionError::GameFinished)
        } else {
            Ok(())
        }
    }

    /// Record a timeout if the running clock is exhausted. Returns whether it
    /// fired.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        if self.is_over() {
            return false;
        }
        match self.clock.expired(now) {
            Some(loser) => {
                info!("game {}: {loser} ran out of time", self.id);
                self.finish(Outcome::win(loser.opponent(), Reason::Timeout), now);
                true
            }
            None => false,
        }
    }

    fn submit_move(
        &mut self,
        mv: Move,
        color: Color,
        expected: Option<usize>,
        now: Instant,
    ) -> Result<(), SessionError> {
        self.ensure_ongoing()?;
        if expected.is_some_and(|len| len != self.history.len()) {
            debug!(
                "game {}: stale submission {mv} (expected {expected:?}, have {})",
                self.id,
                self.history.len()
            );
            return Err(SessionError::Stale);
        }
        if self.check_timeout(now) {
            return Err(SessionError::TimeExpired);
        }
        if color != self.turn {
            return Err(MoveError::WrongTurn.into());
        }

        let mut next = Some(mv);
        while let Some(step) = next.take() {
            next = self.play_step(step, now)?;
        }
        Ok(())
    }

    /// Apply one step for the side to move. Returns a follow-up step to be
    /// played automatically under the current policy.
    fn play_step(&mut self, mv: Move, now: Instant) -> Result<Option<Move>, SessionError> {
        let mover = self.turn;
        let res = resolve(&self.board, mv, mover, self.chain)?;

        self.board = res.board;
        self.history.push(mv, mover, res.board);
        self.version += 1;
        if self.draw_offer == Some(mover.opponent()) {
            debug!("game {}: draw offer lapses after {mover} moved", self.id);
            self.draw_offer = None;
        }
        if res.is_capture() {
            debug!("game {}: {mover} captured with {mv}", self.id);
        } else {
            debug!("game {}: {mover} played {mv}", self.id);
        }

        let follow_up = match res.continuation {
            Continuation::TurnEnds => {
                self.end_turn(mover, now);
                if self.policy.auto_forced_capture && !self.is_over() {
                    sole_forced_capture(&forced_pieces(&self.board, self.turn))
                } else {
                    None
                }
            }
            Continuation::Forced(step) if self.policy.auto_chain_capture => {
                self.chain = Some(step.from);
                self.clock.charge(now);
                Some(step)
            }
            Continuation::Forced(_) | Continuation::Choice(_) => {
                debug!("game {}: {mover} continues capturing from {}", self.id, mv.to);
                self.chain = Some(mv.to);
                self.clock.charge(now);
                None
            }
        };
        Ok(follow_up)
    }

    fn end_turn(&mut self, mover: Color, now: Instant) {
        self.chain = None;
        if let Some(outcome) = evaluate(&self.board, mover, self.policy.kings_only_draw) {
            self.finish(outcome, now);
            return;
        }
        self.turn = mover.opponent();
        self.clock.switch(self.turn, now);
    }

    fn finish(&mut self, outcome: Outcome, now: Instant) {
        self.status = outcome.status;
        self.reason = Some(outcome.reason);
        self.chain = None;
        self.draw_offer = None;
        self.clock.stop(now);
        self.finished_at = Some(now);
        self.version += 1;
        info!(
            "game {} finished: {:?} ({:?})",
            self.id, outcome.status, outcome.reason
        );
    }

    fn offer_draw(&mut self, color: Color, now: Instant) -> Result<Option<Notice>, SessionError> {
        self.ensure_ongoing()?;
        if self.bot == Some(color.opponent()) {
            return Ok(Some(Notice::DrawDeclined(color.opponent())));
        }
        match self.draw_offer {
            // Crossing offers count as agreement
            Some(offerer) if offerer != color => {
                self.finish(Outcome::draw(Reason::Agreement), now);
                Ok(None)
            }
            Some(_) => Ok(None),
            None => {
                info!("game {}: {color} offers a draw", self.id);
                self.draw_offer = Some(color);
                self.version += 1;
                Ok(Some(Notice::DrawOffered(color)))
            }
        }
    }

    fn respond_draw(
        &mut self,
        color: Color,
        accept: bool,
        now: Instant,
    ) -> Result<Option<Notice>, SessionError> {
        self.ensure_ongoing()?;
        let offerer = self.draw_offer.ok_or(SessionError::NoDrawOffer)?;
        if offerer == color {
            return Err(SessionError::OwnOffer);
        }
        self.draw_offer = None;
        if accept {
            self.finish(Outcome::draw(Reason::Agreement), now);
            Ok(None)
        } else {
            info!("game {}: {color} declines the draw", self.id);
            self.version += 1;
            Ok(Some(Notice::DrawDeclined(color)))
        }
    }

    fn ensure_rematch_open(&self) -> Result<(), SessionError> {
        if !self.is_over() {
            return Err(SessionError::GameInProgress);
        }
        if self.rematch_game.is_some() {
            return Err(SessionError::RematchStarted);
        }
        Ok(())
    }

    fn request_rematch(&mut self, color: Color) -> Result<Option<Notice>, SessionError> {
        self.ensure_rematch_open()?;
        // One human on the board: nobody else to ask
        if matches!(self.mode, GameMode::Hotseat | GameMode::Bot) {
            return Ok(Some(Notice::StartRematch));
        }
        match self.rematch_offer {
            Some(requester) if requester != color => Ok(Some(Notice::StartRematch)),
            Some(_) => Ok(None),
            None => {
                info!("game {}: {color} asks for a rematch", self.id);
                self.rematch_offer = Some(color);
                self.version += 1;
                Ok(Some(Notice::RematchOffered(color)))
            }
        }
    }

    fn respond_rematch(&mut self, color: Color, accept: bool) -> Result<Option<Notice>, SessionError> {
        self.ensure_rematch_open()?;
        let requester = self.rematch_offer.ok_or(SessionError::NoRematchOffer)?;
        if requester == color {
            return Err(SessionError::OwnOffer);
        }
        if accept {
            return Ok(Some(Notice::StartRematch));
        }
        self.rematch_offer = None;
        self.version += 1;
        Ok(Some(Notice::RematchDeclined(color)))
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            mode: self.mode,
            board: self.board,
            turn: self.turn,
            timers: self.clock.timers(now),
            history: self.history.notation(),
            status: self.status,
            reason: self.reason,
            players: self.players.clone(),
            rating_change: self.rating_change,
            chain: self.chain,
            draw_offer: self.draw_offer,
            rematch_offer: self.rematch_offer,
            rematch_game: self.rematch_game,
        }
    }

    pub fn ply_snapshot(&self, index: usize) -> Result<PlySnapshot, SessionError> {
        self.history
            .ply_snapshot(index)
            .ok_or(SessionError::PlyOutOfRange)
    }

    pub fn record(&self, finished_at: DateTime<Utc>) -> RecordedGame {
        RecordedGame {
            id: self.id,
            players: self.players.clone(),
            mode: self.mode,
            status: self.status,
            reason: self.reason,
            history: self.history.notation(),
            snapshots: self.history.boards(),
            finished_at,
        }
    }
}
