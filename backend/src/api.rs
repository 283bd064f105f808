use crate::archive::Archive;
use crate::bot::{MoveProducer, RandomBot};
use crate::broadcast::SessionView;
use crate::config::ServerConfig;
use crate::directory::{DirectorySettings, Dispatched, DispatchError, SessionDirectory};
use crate::error::{ApiError, SessionError};
use crate::rating::{EloTable, RatingService};
use crate::session::Command;
use crate::ws;
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use draughts_engine::Pos;
use shared::{
    ColorRequest, CreateGameRequest, CurrentGame, Destinations, GameId, MoveRequest,
    OfferResponse, PlySnapshot, RecordedGame, RematchStatus, SessionSnapshot, SquareQuery,
    Timers,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use web_time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<SessionDirectory>,
    pub archive: Archive,
}

impl AppState {
    pub fn new(config: &ServerConfig, archive: Archive) -> Self {
        Self::with_collaborators(
            DirectorySettings::from(config),
            archive,
            Arc::new(EloTable::new()),
            Arc::new(RandomBot),
        )
    }

    pub fn with_collaborators(
        settings: DirectorySettings,
        archive: Archive,
        rating: Arc<dyn RatingService>,
        bot: Arc<dyn MoveProducer>,
    ) -> Self {
        Self {
            directory: Arc::new(SessionDirectory::new(settings, rating, bot)),
            archive,
        }
    }

    /// Periodically record unattended timeouts and evict old finished games
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                state.sweep_once(Instant::now()).await;
            }
        })
    }

    /// One sweeper pass at `now`, archiving games that lost on time
    pub async fn sweep_once(&self, now: Instant) -> usize {
        let swept = self.directory.sweep(now);
        for record in &swept.expired {
            archive_record(self, record).await;
        }
        swept.evicted
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/games", post(create_game))
        .route("/api/board/{id}", get(board))
        .route("/api/moves/{id}", get(moves))
        .route("/api/captures/{id}", get(captures))
        .route("/api/snapshot/{id}/{index}", get(snapshot_at))
        .route("/api/timers/{id}", get(timers))
        .route("/api/move/{id}", post(submit_move))
        .route("/api/resign/{id}", post(resign))
        .route("/api/draw_offer/{id}", post(offer_draw))
        .route("/api/draw_response/{id}", post(respond_draw))
        .route("/api/check_timeout/{id}", post(check_timeout))
        .route("/api/rematch_request/{id}", post(request_rematch))
        .route("/api/rematch_response/{id}", post(respond_rematch))
        .route("/api/users/{user}/current", get(current_game))
        .route("/api/replay/{id}", get(replay))
        .route("/api/replay/{id}/{index}", get(replay_at))
        .route("/ws/board/{id}", get(ws::ws_handler))
        .with_state(state)
}

/// Dispatch a command and archive the game if it just ended. Shared by the
/// HTTP and WebSocket surfaces.
pub async fn execute(state: &AppState, id: GameId, command: Command) -> Result<Dispatched, ApiError> {
    match state.directory.dispatch(id, command) {
        Ok(done) => {
            if let Some(record) = &done.finished {
                archive_record(state, record).await;
            }
            Ok(done)
        }
        Err(DispatchError::NotFound) => Err(ApiError::NotFound),
        Err(DispatchError::Rejected { error, finished }) => {
            if let Some(record) = &finished {
                archive_record(state, record).await;
            }
            Err(error.into())
        }
    }
}

async fn archive_record(state: &AppState, record: &RecordedGame) {
    // The live session stays authoritative if the write fails
    if let Err(err) = state.archive.store(record).await {
        error!("failed to archive game {}: {err}", record.id);
    }
}

/// Latest view, recording an overdue timeout first
pub async fn fresh_view(state: &AppState, id: GameId) -> Result<Arc<SessionView>, ApiError> {
    let handle = state.directory.get(id).ok_or(ApiError::NotFound)?;
    if handle.view().timeout_due(Instant::now()) {
        execute(state, id, Command::CheckTimeout).await?;
    }
    Ok(handle.view())
}

pub async fn fresh_snapshot(state: &AppState, id: GameId) -> Result<SessionSnapshot, ApiError> {
    Ok(fresh_view(state, id).await?.at(Instant::now()))
}

async fn create_game(
    State(state): State<AppState>,
    Json(req): Json<CreateGameRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let handle = state.directory.create(&req)?;
    info!("created game {} via api", handle.id());
    Ok(Json(handle.snapshot(Instant::now())))
}

async fn board(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    fresh_snapshot(&state, id).await.map(Json)
}

async fn timers(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<Timers>, ApiError> {
    Ok(Json(fresh_snapshot(&state, id).await?.timers))
}

async fn moves(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Query(query): Query<SquareQuery>,
) -> Result<Json<Destinations>, ApiError> {
    let view = fresh_view(&state, id).await?;
    let from = square(&query)?;
    Ok(Json(Destinations {
        from,
        destinations: view.destinations(from, query.color),
    }))
}

async fn captures(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Query(query): Query<SquareQuery>,
) -> Result<Json<Destinations>, ApiError> {
    let view = fresh_view(&state, id).await?;
    let from = square(&query)?;
    Ok(Json(Destinations {
        from,
        destinations: view.captures(from, query.color),
    }))
}

fn square(query: &SquareQuery) -> Result<Pos, ApiError> {
    let pos = Pos::new(query.row, query.col);
    if pos.in_bounds() {
        Ok(pos)
    } else {
        Err(SessionError::Rule(draughts_engine::MoveError::OutOfBounds).into())
    }
}

async fn snapshot_at(
    State(state): State<AppState>,
    Path((id, index)): Path<(GameId, usize)>,
) -> Result<Json<PlySnapshot>, ApiError> {
    let view = state.directory.get(id).ok_or(ApiError::NotFound)?.view();
    Ok(Json(view.ply_snapshot(index)?))
}

async fn submit_move(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(execute(&state, id, req.into()).await?.snapshot))
}

async fn resign(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(req): Json<ColorRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let command = Command::Resign { color: req.color };
    Ok(Json(execute(&state, id, command).await?.snapshot))
}

async fn offer_draw(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(req): Json<ColorRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let command = Command::OfferDraw { color: req.color };
    Ok(Json(execute(&state, id, command).await?.snapshot))
}

async fn respond_draw(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(req): Json<OfferResponse>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let command = Command::RespondDraw {
        color: req.color,
        accept: req.accept,
    };
    Ok(Json(execute(&state, id, command).await?.snapshot))
}

async fn check_timeout(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(execute(&state, id, Command::CheckTimeout).await?.snapshot))
}

fn rematch_status(done: Dispatched) -> RematchStatus {
    RematchStatus {
        pending: done.snapshot.rematch_offer,
        game_id: done.rematch.or(done.snapshot.rematch_game),
    }
}

async fn request_rematch(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(req): Json<ColorRequest>,
) -> Result<Json<RematchStatus>, ApiError> {
    let command = Command::RequestRematch { color: req.color };
    Ok(Json(rematch_status(execute(&state, id, command).await?)))
}

async fn respond_rematch(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(req): Json<OfferResponse>,
) -> Result<Json<RematchStatus>, ApiError> {
    let command = Command::RespondRematch {
        color: req.color,
        accept: req.accept,
    };
    Ok(Json(rematch_status(execute(&state, id, command).await?)))
}

async fn current_game(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<CurrentGame>, ApiError> {
    if let Some(id) = state.directory.game_of(&user) {
        match fresh_view(&state, id).await {
            Ok(_) | Err(ApiError::NotFound) => {}
            Err(err) => return Err(err),
        }
    }
    state
        .directory
        .current_game(&user)
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn replay(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<RecordedGame>, ApiError> {
    state.archive.fetch(id).await?.map(Json).ok_or(ApiError::NotFound)
}

/// Stored board at ply `index`, clamped to the recorded range
async fn replay_at(
    State(state): State<AppState>,
    Path((id, index)): Path<(GameId, usize)>,
) -> Result<Json<PlySnapshot>, ApiError> {
    let game = state.archive.fetch(id).await?.ok_or(ApiError::NotFound)?;
    let total = game.history.len();
    let index = index.min(total);
    let board = game
        .snapshots
        .get(index)
        .copied()
        .ok_or(SessionError::PlyOutOfRange)?;
    Ok(Json(PlySnapshot {
        index,
        board,
        notation: index
            .checked_sub(1)
            .and_then(|i| game.history.get(i).cloned()),
        total,
    }))
}
