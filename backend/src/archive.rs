//! Archive of finished games
//!
//! Each terminal transition writes one row to `recorded_games`. Notation and
//! per-ply boards are stored as JSON text; replay reads them back verbatim.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use shared::{GameId, Players, RecordedGame};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("corrupt archive column {column}: {source}")]
    Decode {
        column: &'static str,
        source: serde_json::Error,
    },
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS recorded_games (
    id TEXT PRIMARY KEY,
    white TEXT,
    black TEXT,
    mode TEXT NOT NULL,
    status TEXT NOT NULL,
    reason TEXT,
    history TEXT NOT NULL,
    snapshots TEXT NOT NULL,
    finished_at DATETIME NOT NULL
);";

#[derive(Clone, Debug)]
pub struct Archive {
    pool: SqlitePool,
}

impl Archive {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url` and ensure the schema
    pub async fn connect(url: &str) -> Result<Self, ArchiveError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let archive = Self::new(pool);
        archive.migrate().await?;
        Ok(archive)
    }

    /// Single-connection in-memory archive
    pub async fn in_memory() -> Result<Self, ArchiveError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let archive = Self::new(pool);
        archive.migrate().await?;
        Ok(archive)
    }

    pub async fn migrate(&self) -> Result<(), ArchiveError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn store(&self, game: &RecordedGame) -> Result<(), ArchiveError> {
        sqlx::query(
            "INSERT OR REPLACE INTO recorded_games
                (id, white, black, mode, status, reason, history, snapshots, finished_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(game.id.to_string())
        .bind(&game.players.white)
        .bind(&game.players.black)
        .bind(encode_tag(&game.mode, "mode")?)
        .bind(encode_tag(&game.status, "status")?)
        .bind(game.reason.as_ref().map(|r| encode_tag(r, "reason")).transpose()?)
        .bind(encode(&game.history, "history")?)
        .bind(encode(&game.snapshots, "snapshots")?)
        .bind(game.finished_at)
        .execute(&self.pool)
        .await?;
        info!("archived game {} ({} plies)", game.id, game.history.len());
        Ok(())
    }

    pub async fn fetch(&self, id: GameId) -> Result<Option<RecordedGame>, ArchiveError> {
        let row = sqlx::query(
            "SELECT white, black, mode, status, reason, history, snapshots, finished_at
             FROM recorded_games WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let reason: Option<String> = row.try_get("reason")?;
        let finished_at: DateTime<Utc> = row.try_get("finished_at")?;
        Ok(Some(RecordedGame {
            id,
            players: Players {
                white: row.try_get("white")?,
                black: row.try_get("black")?,
            },
            mode: decode_tag(row.try_get("mode")?, "mode")?,
            status: decode_tag(row.try_get("status")?, "status")?,
            reason: reason.map(|r| decode_tag(r, "reason")).transpose()?,
            history: decode(&row.try_get::<String, _>("history")?, "history")?,
            snapshots: decode(&row.try_get::<String, _>("snapshots")?, "snapshots")?,
            finished_at,
        }))
    }
}

fn encode<T: Serialize>(value: &T, column: &'static str) -> Result<String, ArchiveError> {
    serde_json::to_string(value).map_err(|source| ArchiveError::Decode { column, source })
}

fn decode<T: DeserializeOwned>(raw: &str, column: &'static str) -> Result<T, ArchiveError> {
    serde_json::from_str(raw).map_err(|source| ArchiveError::Decode { column, source })
}

/// Unit enums are stored as their bare snake_case name
fn encode_tag<T: Serialize>(value: &T, column: &'static str) -> Result<String, ArchiveError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(tag)) => Ok(tag),
        Ok(other) => Ok(other.to_string()),
        Err(source) => Err(ArchiveError::Decode { column, source }),
    }
}

fn decode_tag<T: DeserializeOwned>(tag: String, column: &'static str) -> Result<T, ArchiveError> {
    serde_json::from_value(serde_json::Value::String(tag))
        .map_err(|source| ArchiveError::Decode { column, source })
}
