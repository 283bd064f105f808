//! # Session Directory
//!
//! Owns every live [`GameSession`], one [`SessionHandle`] per game id:
//!
//! ```text
//! SessionDirectory
//!   ├── sessions: id → SessionHandle { Mutex<GameSession>, Broadcaster }
//!   └── players:  user → id of the user's ongoing game
//! ```
//!
//! Writers serialize on the per-game mutex; readers use the broadcaster's
//! latest view and never take it. The mutex is never held across an await.
//! Finished sessions stay resolvable until [`SessionDirectory::sweep`]
//! evicts them.

use crate::bot::{self, MoveProducer};
use crate::broadcast::{Broadcaster, SessionView, Subscription};
use crate::config::{RulePolicy, ServerConfig};
use crate::error::SessionError;
use crate::rating::RatingService;
use crate::session::{Command, GameSession, Notice, SessionSetup};
use chrono::Utc;
use draughts_engine::Color;
use parking_lot::{Mutex, RwLock};
use shared::{
    CreateGameRequest, CurrentGame, GameId, GameMode, Players, RecordedGame, ServerEvent,
    SessionSnapshot,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;
use web_time::Instant;

pub const BOT_NAME: &str = "bot";

/// Directory-wide settings taken from [`ServerConfig`]
#[derive(Debug, Clone, Copy)]
pub struct DirectorySettings {
    pub clock: Duration,
    pub policy: RulePolicy,
    pub finished_ttl: Duration,
    pub broadcast_capacity: usize,
}

impl From<&ServerConfig> for DirectorySettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            clock: config.clock,
            policy: config.policy,
            finished_ttl: config.finished_ttl,
            broadcast_capacity: config.broadcast_capacity,
        }
    }
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

pub struct SessionHandle {
    id: GameId,
    session: Mutex<GameSession>,
    broadcaster: Broadcaster,
}

impl SessionHandle {
    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn view(&self) -> Arc<SessionView> {
        self.broadcaster.latest()
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        self.view().at(now)
    }

    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }
}

/// What a successful command produced
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub snapshot: SessionSnapshot,
    /// Set when this command ended the game
    pub finished: Option<RecordedGame>,
    /// Set when this command started a rematch
    pub rematch: Option<GameId>,
}

pub struct SessionDirectory {
    sessions: RwLock<HashMap<GameId, Arc<SessionHandle>>>,
    players: RwLock<HashMap<String, GameId>>,
    settings: DirectorySettings,
    rating: Arc<dyn RatingService>,
    bot: Arc<dyn MoveProducer>,
}

impl SessionDirectory {
    pub fn new(
        settings: DirectorySettings,
        rating: Arc<dyn RatingService>,
        bot: Arc<dyn MoveProducer>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            players: RwLock::new(HashMap::new()),
            settings,
            rating,
            bot,
        }
    }

    pub fn settings(&self) -> &DirectorySettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn get(&self, id: GameId) -> Option<Arc<SessionHandle>> {
        self.sessions.read().get(&id).cloned()
    }

    /// Start a new session from a lobby/matchmaker request
    pub fn create(&self, req: &CreateGameRequest) -> Result<Arc<SessionHandle>, SessionError> {
        let mut players = Players {
            white: req.white.clone(),
            black: req.black.clone(),
        };
        let bot = match req.mode {
            GameMode::Bot => {
                let color = req.bot_color.unwrap_or(Color::Black);
                match color {
                    Color::White => players.white = Some(BOT_NAME.to_string()),
                    Color::Black => players.black = Some(BOT_NAME.to_string()),
                }
                Some(color)
            }
            _ if req.bot_color.is_some() => return Err(SessionError::InvalidPlayer),
            _ => None,
        };
        if req.mode == GameMode::Hotseat && players.black.is_none() {
            players.black = players.white.clone();
        }

        let mut setup = SessionSetup::new(Uuid::new_v4(), req.mode, players);
        setup.clock = req
            .clock_secs
            .map(Duration::from_secs)
            .unwrap_or(self.settings.clock);
        setup.policy = self.settings.policy;
        setup.bot = bot;
        Ok(self.insert(setup, Instant::now()))
    }

    fn insert(&self, setup: SessionSetup, now: Instant) -> Arc<SessionHandle> {
        let mut session = GameSession::new(setup, now);
        if let Err(err) = bot::play_turn(&mut session, &*self.bot, now) {
            warn!("game {}: bot could not open: {err}", session.id());
        }

        let id = session.id();
        let mode = session.mode();
        let players = session.players().clone();
        let handle = Arc::new(SessionHandle {
            id,
            broadcaster: Broadcaster::new(
                SessionView::of(&session, now),
                self.settings.broadcast_capacity,
            ),
            session: Mutex::new(session),
        });

        {
            let mut index = self.players.write();
            for user in [&players.white, &players.black]
                .into_iter()
                .flatten()
                .filter(|user| user.as_str() != BOT_NAME)
            {
                index.insert(user.clone(), id);
            }
        }
        self.sessions.write().insert(id, handle.clone());
        info!(
            "game {id} created ({mode:?}, white={:?}, black={:?})",
            players.white, players.black
        );
        handle
    }

    /// Id of the game `user` was last seated in
    pub fn game_of(&self, user: &str) -> Option<GameId> {
        self.players.read().get(user).copied()
    }

    /// The ongoing game of `user`, if any. A game whose clock ran out counts
    /// as over even before the timeout is recorded.
    pub fn current_game(&self, user: &str) -> Option<CurrentGame> {
        let id = self.game_of(user)?;
        let view = self.get(id)?.view();
        if view.timeout_due(Instant::now()) {
            return None;
        }
        let snapshot = view.snapshot();
        if snapshot.is_over() {
            return None;
        }
        let color = match snapshot.mode {
            GameMode::Hotseat => None,
            _ => snapshot.players.color_of(user),
        };
        Some(CurrentGame {
            game_id: id,
            mode: snapshot.mode,
            color,
        })
    }

    /// Run one command against game `id` under its writer lock
    pub fn dispatch(&self, id: GameId, command: Command) -> Result<Dispatched, DispatchError> {
        self.dispatch_at(id, command, Instant::now())
    }

    fn dispatch_at(
        &self,
        id: GameId,
        command: Command,
        now: Instant,
    ) -> Result<Dispatched, DispatchError> {
        let handle = self.get(id).ok_or(DispatchError::NotFound)?;
        let mut session = handle.session.lock();

        if let (Some(color), Some(bot)) = (command.actor(), session.bot()) {
            if color == bot {
                return Err(SessionError::InvalidPlayer.into());
            }
        }

        let before = session.version();
        let was_over = session.is_over();
        let mut result = session.apply(command, now);
        if result.is_ok() {
            if let Err(err) = bot::play_turn(&mut session, &*self.bot, now) {
                warn!("game {id}: bot move failed: {err}");
            }
        }

        let mut rematch = None;
        if let Ok(Some(Notice::StartRematch)) = result {
            let next = self.insert(SessionSetup::rematch_of(&session, Uuid::new_v4()), now);
            session.set_rematch_game(next.id());
            info!("game {id}: rematch started as {}", next.id());
            rematch = Some(next.id());
            result = Ok(None);
        }

        let finished = if !was_over && session.is_over() {
            self.settle(&mut session);
            self.release_players(&session);
            Some(session.record(Utc::now()))
        } else {
            None
        };

        if session.version() != before {
            handle
                .broadcaster
                .publish(SessionView::of(&session, now), now);
        }
        if let Some(game_id) = rematch {
            handle
                .broadcaster
                .notify(ServerEvent::RematchStarted { game_id });
        }
        let snapshot = session.snapshot(now);
        drop(session);

        match result {
            Ok(notice) => {
                if let Some(event) = notice.and_then(notice_event) {
                    handle.broadcaster.notify(event);
                }
                debug!("game {id}: {} applied", command.name());
                Ok(Dispatched {
                    snapshot,
                    finished,
                    rematch,
                })
            }
            Err(err) => {
                debug!("game {id}: {} rejected: {err}", command.name());
                Err(DispatchError::Rejected {
                    error: err,
                    finished,
                })
            }
        }
    }

    fn settle(&self, session: &mut GameSession) {
        if session.mode() != GameMode::Rated {
            return;
        }
        let players = session.players().clone();
        let (Some(white), Some(black)) = (players.white, players.black) else {
            return;
        };
        if let Some(change) = self.rating.settle(&white, &black, session.status()) {
            info!("game {}: rating change {change:?}", session.id());
            session.set_rating_change(change);
        }
    }

    fn release_players(&self, session: &GameSession) {
        let mut index = self.players.write();
        for user in [&session.players().white, &session.players().black]
            .into_iter()
            .flatten()
        {
            if index.get(user) == Some(&session.id()) {
                index.remove(user);
            }
        }
    }

    /// Record every overdue timeout, then evict sessions finished more than
    /// the configured TTL before `now`. Games whose clock ran out with
    /// nobody watching are resolved here and evicted on a later pass.
    pub fn sweep(&self, now: Instant) -> Swept {
        let overdue: Vec<GameId> = self
            .sessions
            .read()
            .iter()
            .filter(|(_, handle)| handle.view().timeout_due(now))
            .map(|(id, _)| *id)
            .collect();
        let expired: Vec<RecordedGame> = overdue
            .into_iter()
            .filter_map(|id| match self.dispatch_at(id, Command::CheckTimeout, now) {
                Ok(done) => done.finished,
                Err(_) => None,
            })
            .collect();
        if !expired.is_empty() {
            info!("recorded {} unattended timeout(s)", expired.len());
        }

        let ttl = self.settings.finished_ttl;
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|id, handle| {
            let stale = handle
                .view()
                .finished_at()
                .is_some_and(|at| now.saturating_duration_since(at) >= ttl);
            if stale {
                debug!("evicting finished game {id}");
            }
            !stale
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("swept {evicted} finished game(s)");
        }
        Swept { expired, evicted }
    }
}

/// Outcome of one sweeper pass
#[derive(Debug, Default)]
pub struct Swept {
    /// Games that just lost on time; still to be archived
    pub expired: Vec<RecordedGame>,
    pub evicted: usize,
}

fn notice_event(notice: Notice) -> Option<ServerEvent> {
    match notice {
        Notice::DrawOffered(from) => Some(ServerEvent::DrawOffered { from }),
        Notice::DrawDeclined(by) => Some(ServerEvent::DrawDeclined { by }),
        Notice::RematchOffered(from) => Some(ServerEvent::RematchOffered { from }),
        Notice::RematchDeclined(by) => Some(ServerEvent::RematchDeclined { by }),
        Notice::StartRematch => None,
    }
}

/// A refused dispatch. `finished` carries the record when the refusal
/// followed a timeout transition.
#[derive(Debug)]
pub enum DispatchError {
    NotFound,
    Rejected {
        error: SessionError,
        finished: Option<RecordedGame>,
    },
}

impl From<SessionError> for DispatchError {
    fn from(error: SessionError) -> Self {
        DispatchError::Rejected {
            error,
            finished: None,
        }
    }
}
