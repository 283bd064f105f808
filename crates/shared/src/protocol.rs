use chrono::{DateTime, Utc};
use draughts_engine::{Board, Color, Pos, Reason, Status};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GameId = Uuid;

/// How a session was set up
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Ranked game between two users; finishing settles ratings
    Rated,
    #[default]
    Casual,
    /// One participant plays both colors
    Hotseat,
    /// One color is played by the server's move producer
    Bot,
}

/// Remaining clock time in seconds. `turn` is the running clock, `None` once
/// the game is over.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Timers {
    pub white: f64,
    pub black: f64,
    pub turn: Option<Color>,
}

impl Timers {
    pub fn remaining(&self, color: Color) -> f64 {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}

/// Display names of the participants
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Players {
    pub white: Option<String>,
    pub black: Option<String>,
}

impl Players {
    pub fn get(&self, color: Color) -> Option<&str> {
        match color {
            Color::White => self.white.as_deref(),
            Color::Black => self.black.as_deref(),
        }
    }

    pub fn color_of(&self, user: &str) -> Option<Color> {
        if self.white.as_deref() == Some(user) {
            Some(Color::White)
        } else if self.black.as_deref() == Some(user) {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn swapped(&self) -> Players {
        Players {
            white: self.black.clone(),
            black: self.white.clone(),
        }
    }
}

/// Per-color rating delta produced when a rated game ends
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RatingChange {
    pub white: i32,
    pub black: i32,
}

/// Externally visible state of one game session
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub id: GameId,
    pub mode: GameMode,
    pub board: Board,
    pub turn: Color,
    pub timers: Timers,
    /// Notation of every applied step, e.g. `"C3->D4"`
    pub history: Vec<String>,
    pub status: Status,
    pub reason: Option<Reason>,
    pub players: Players,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_change: Option<RatingChange>,
    /// Square of the piece that must continue capturing
    #[serde(default)]
    pub chain: Option<Pos>,
    #[serde(default)]
    pub draw_offer: Option<Color>,
    #[serde(default)]
    pub rematch_offer: Option<Color>,
    /// Session created by an accepted rematch
    #[serde(default)]
    pub rematch_game: Option<GameId>,
}

impl SessionSnapshot {
    /// Number of applied steps, the value clients echo back as
    /// `expected_history_length`
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    pub fn is_over(&self) -> bool {
        self.status.is_over()
    }
}

// ============================================================================
// HTTP bodies
// ============================================================================

/// `POST /api/games`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CreateGameRequest {
    pub white: Option<String>,
    pub black: Option<String>,
    #[serde(default)]
    pub mode: GameMode,
    pub clock_secs: Option<u64>,
    /// Color played by the server in `Bot` games (defaults to black)
    pub bot_color: Option<Color>,
}

/// `POST /api/move/{id}`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MoveRequest {
    pub from: Pos,
    pub to: Pos,
    pub color: Color,
    /// History length the client saw; a mismatch marks the submission stale
    #[serde(default)]
    pub expected_history_length: Option<usize>,
}

/// Body of resign, draw offer and rematch request
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorRequest {
    pub color: Color,
}

/// Answer to a draw or rematch offer
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfferResponse {
    pub color: Color,
    pub accept: bool,
}

/// Query of `GET /api/moves/{id}` and `GET /api/captures/{id}`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SquareQuery {
    pub row: i8,
    pub col: i8,
    pub color: Color,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Destinations {
    pub from: Pos,
    pub destinations: Vec<Pos>,
}

/// Board at one ply; index 0 is the starting position
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlySnapshot {
    pub index: usize,
    pub board: Board,
    /// Notation of the step that produced this board
    pub notation: Option<String>,
    pub total: usize,
}

/// Result of a rematch request or response
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RematchStatus {
    pub pending: Option<Color>,
    pub game_id: Option<GameId>,
}

/// `GET /api/users/{user}/current`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CurrentGame {
    pub game_id: GameId,
    pub mode: GameMode,
    /// `None` when the user plays both colors
    pub color: Option<Color>,
}

/// A finished game as stored in the archive
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RecordedGame {
    pub id: GameId,
    pub players: Players,
    pub mode: GameMode,
    pub status: Status,
    pub reason: Option<Reason>,
    pub history: Vec<String>,
    /// Board after each ply, starting with the initial position
    pub snapshots: Vec<Board>,
    pub finished_at: DateTime<Utc>,
}

/// Body of every 4xx/5xx response
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: String,
}

// ============================================================================
// Duplex channel
// ============================================================================

/// Server → client messages on `/ws/board/{id}`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full state after any change
    Snapshot(SessionSnapshot),
    DrawOffered { from: Color },
    DrawDeclined { by: Color },
    RematchOffered { from: Color },
    RematchDeclined { by: Color },
    RematchStarted { game_id: GameId },
    /// Sent only to the connection whose command was refused
    Rejected { reason: String },
}

/// Client → server messages on `/ws/board/{id}`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SubmitMove(MoveRequest),
    Resign { color: Color },
    OfferDraw { color: Color },
    RespondDraw { color: Color, accept: bool },
    CheckTimeout,
    RequestRematch { color: Color },
    RespondRematch { color: Color, accept: bool },
    /// Ask for a fresh snapshot
    Sync,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            id: Uuid::nil(),
            mode: GameMode::Casual,
            board: Board::initial(),
            turn: Color::White,
            timers: Timers {
                white: 600.0,
                black: 600.0,
                turn: Some(Color::White),
            },
            history: Vec::new(),
            status: Status::Ongoing,
            reason: None,
            players: Players {
                white: Some("alice".to_string()),
                black: Some("bob".to_string()),
            },
            rating_change: None,
            chain: None,
            draw_offer: None,
            rematch_offer: None,
            rematch_game: None,
        }
    }

    #[test]
    fn test_snapshot_event_is_flat_and_tagged() {
        let event = ServerEvent::Snapshot(snapshot());
        let value = serde_json::to_value(&event).expect("Should serialize");

        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["status"], "ongoing");
        assert_eq!(value["timers"]["turn"], "white");
        assert_eq!(value["board"][0][1], "b");
        assert_eq!(value["players"]["white"], "alice");
        assert!(
            value.get("rating_change").is_none(),
            "Absent rating change is omitted"
        );

        let back: ServerEvent = serde_json::from_value(value).expect("Should deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn test_out_of_band_events() {
        let value = serde_json::to_value(ServerEvent::DrawOffered { from: Color::Black })
            .expect("Should serialize");
        assert_eq!(value, json!({"type": "draw_offered", "from": "black"}));

        let id = Uuid::new_v4();
        let value =
            serde_json::to_value(ServerEvent::RematchStarted { game_id: id }).expect("Should serialize");
        assert_eq!(value["type"], "rematch_started");
        assert_eq!(value["game_id"], Value::String(id.to_string()));
    }

    #[test]
    fn test_client_message_submit_move() {
        let raw = r#"{"type":"submit_move","from":[5,2],"to":[4,3],"color":"white","expected_history_length":0}"#;
        let msg: ClientMessage = serde_json::from_str(raw).expect("Should deserialize");
        assert_eq!(
            msg,
            ClientMessage::SubmitMove(MoveRequest {
                from: Pos::new(5, 2),
                to: Pos::new(4, 3),
                color: Color::White,
                expected_history_length: Some(0),
            })
        );
    }

    #[test]
    fn test_client_message_unit_variants() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"check_timeout"}"#).expect("Should deserialize");
        assert_eq!(msg, ClientMessage::CheckTimeout);

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"respond_draw","color":"black","accept":true}"#)
            .expect("Should deserialize");
        assert_eq!(
            msg,
            ClientMessage::RespondDraw {
                color: Color::Black,
                accept: true
            }
        );
    }

    #[test]
    fn test_create_game_request_defaults() {
        let req: CreateGameRequest = serde_json::from_str("{}").expect("Should deserialize");
        assert_eq!(req.mode, GameMode::Casual);
        assert_eq!(req.clock_secs, None);
    }

    #[test]
    fn test_players_lookup() {
        let players = snapshot().players;
        assert_eq!(players.color_of("bob"), Some(Color::Black));
        assert_eq!(players.color_of("carol"), None);
        assert_eq!(players.swapped().get(Color::White), Some("bob"));
    }
}
