//! Error types for the game authority and its HTTP surface

use crate::archive::ArchiveError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use draughts_engine::MoveError;
use shared::ErrorBody;
use thiserror::Error;

/// Why a session refused a command. A refusal never changes the session,
/// except `TimeExpired`, which reports the timeout transition it triggered.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Rule(#[from] MoveError),

    #[error("game finished")]
    GameFinished,

    #[error("game in progress")]
    GameInProgress,

    /// The client's view of the history is behind or ahead of the session
    #[error("stale submission")]
    Stale,

    #[error("time expired")]
    TimeExpired,

    #[error("no draw offer")]
    NoDrawOffer,

    #[error("no rematch offer")]
    NoRematchOffer,

    #[error("cannot answer own offer")]
    OwnOffer,

    #[error("rematch already started")]
    RematchStarted,

    /// The color is played by the server
    #[error("invalid player")]
    InvalidPlayer,

    #[error("ply index out of range")]
    PlyOutOfRange,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("game not found")]
    NotFound,

    #[error("{0}")]
    Rejected(SessionError),

    #[error("{0}")]
    Forbidden(SessionError),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidPlayer => ApiError::Forbidden(err),
            other => ApiError::Rejected(other),
        }
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Database(e) => ApiError::Storage(e),
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        } else {
            tracing::debug!("request rejected: {self}");
        }
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_reasons_pass_through() {
        let err = SessionError::from(MoveError::MustCapture);
        assert_eq!(err.to_string(), "must capture");
        assert_eq!(ApiError::from(err).to_string(), "must capture");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(SessionError::Stale).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(SessionError::InvalidPlayer).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
