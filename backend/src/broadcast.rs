//! # Broadcast Channel
//!
//! Fan-out of session state to every subscriber of one game:
//!
//! - a `watch` slot holding the latest [`SessionView`], read without touching
//!   the session lock;
//! - a bounded `broadcast` queue of [`ServerEvent`]s. Publishing never waits
//!   on subscribers. A subscriber that falls behind loses the oldest events
//!   and resynchronizes from the latest view.

use crate::clock::Clock;
use crate::error::SessionError;
use crate::history::History;
use crate::session::GameSession;
use draughts_engine::{capture_moves, legal_destinations, Color, Pos};
use shared::{PlySnapshot, ServerEvent, SessionSnapshot};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use web_time::Instant;

/// Immutable copy of a session at its last change
#[derive(Debug, Clone)]
pub struct SessionView {
    snapshot: SessionSnapshot,
    clock: Clock,
    history: History,
    finished_at: Option<Instant>,
}

impl SessionView {
    pub fn of(session: &GameSession, now: Instant) -> Self {
        Self {
            snapshot: session.snapshot(now),
            clock: *session.clock(),
            history: session.history().clone(),
            finished_at: session.finished_at(),
        }
    }

    /// The snapshot with clocks read at `now`
    pub fn at(&self, now: Instant) -> SessionSnapshot {
        let mut snapshot = self.snapshot.clone();
        snapshot.timers = self.clock.timers(now);
        snapshot
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn is_over(&self) -> bool {
        self.snapshot.is_over()
    }

    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at
    }

    pub fn ply_snapshot(&self, index: usize) -> Result<PlySnapshot, SessionError> {
        self.history
            .ply_snapshot(index)
            .ok_or(SessionError::PlyOutOfRange)
    }

    /// The running clock has run out but nobody has noticed yet
    pub fn timeout_due(&self, now: Instant) -> bool {
        !self.is_over() && self.clock.expired(now).is_some()
    }

    fn chain_for(&self, color: Color) -> Option<Pos> {
        (color == self.snapshot.turn)
            .then_some(self.snapshot.chain)
            .flatten()
    }

    /// Playable destinations for the piece on `pos`, forced captures included
    pub fn destinations(&self, pos: Pos, color: Color) -> Vec<Pos> {
        if self.is_over() {
            return Vec::new();
        }
        legal_destinations(&self.snapshot.board, pos, color, self.chain_for(color))
    }

    /// Capture landings for the piece on `pos`
    pub fn captures(&self, pos: Pos, color: Color) -> Vec<Pos> {
        if self.is_over() {
            return Vec::new();
        }
        let board = &self.snapshot.board;
        if board.piece_at(pos).map(|p| p.color) != Some(color) {
            return Vec::new();
        }
        match self.chain_for(color) {
            Some(chain) if chain != pos => Vec::new(),
            _ => capture_moves(board, pos),
        }
    }
}

pub type Subscription = broadcast::Receiver<ServerEvent>;

#[derive(Debug)]
pub struct Broadcaster {
    latest: watch::Sender<Arc<SessionView>>,
    events: broadcast::Sender<ServerEvent>,
}

impl Broadcaster {
    pub fn new(initial: SessionView, capacity: usize) -> Self {
        let (latest, _) = watch::channel(Arc::new(initial));
        let (events, _) = broadcast::channel(capacity);
        Self { latest, events }
    }

    pub fn latest(&self) -> Arc<SessionView> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Replace the view and push a snapshot event
    pub fn publish(&self, view: SessionView, now: Instant) {
        let snapshot = view.at(now);
        self.latest.send_replace(Arc::new(view));
        // No receivers is not an error
        let _ = self.events.send(ServerEvent::Snapshot(snapshot));
    }

    pub fn notify(&self, event: ServerEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Command, SessionSetup};
    use draughts_engine::Move;
    use shared::{GameMode, Players};
    use uuid::Uuid;

    fn session() -> GameSession {
        GameSession::new(
            SessionSetup::new(Uuid::new_v4(), GameMode::Casual, Players::default()),
            Instant::now(),
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers_and_view() {
        let mut game = session();
        let now = Instant::now();
        let hub = Broadcaster::new(SessionView::of(&game, now), 8);
        let mut rx = hub.subscribe();

        game.apply(
            Command::Move {
                mv: Move::new(Pos::new(5, 2), Pos::new(4, 3)),
                color: Color::White,
                expected_history_length: None,
            },
            now,
        )
        .expect("Legal");
        hub.publish(SessionView::of(&game, now), now);

        match rx.recv().await.expect("Event delivered") {
            ServerEvent::Snapshot(snapshot) => assert_eq!(snapshot.ply(), 1),
            other => panic!("Unexpected event {other:?}"),
        }
        assert_eq!(hub.latest().snapshot().ply(), 1);
    }

    #[test]
    fn test_publish_without_subscribers_does_not_fail() {
        let game = session();
        let now = Instant::now();
        let hub = Broadcaster::new(SessionView::of(&game, now), 1);
        hub.notify(ServerEvent::DrawDeclined { by: Color::Black });
        hub.publish(SessionView::of(&game, now), now);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_instead_of_blocking() {
        let game = session();
        let now = Instant::now();
        let hub = Broadcaster::new(SessionView::of(&game, now), 2);
        let mut rx = hub.subscribe();
        for _ in 0..5 {
            hub.notify(ServerEvent::DrawOffered { from: Color::White });
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }

    #[test]
    fn test_view_answers_legality_queries() {
        let game = session();
        let view = SessionView::of(&game, Instant::now());
        let mut moves = view.destinations(Pos::new(5, 2), Color::White);
        moves.sort();
        assert_eq!(moves, vec![Pos::new(4, 1), Pos::new(4, 3)]);
        assert!(view.captures(Pos::new(5, 2), Color::White).is_empty());
        assert!(view.destinations(Pos::new(2, 1), Color::White).is_empty());
    }
}
