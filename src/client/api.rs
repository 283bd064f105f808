//! REST client for the draughts server

use draughts_engine::{Color, Pos};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    ColorRequest, CreateGameRequest, CurrentGame, Destinations, ErrorBody, GameId, MoveRequest,
    OfferResponse, PlySnapshot, RecordedGame, RematchStatus, SessionSnapshot, Timers,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error body
    #[error("{status}: {detail}")]
    Rejected {
        status: reqwest::StatusCode,
        detail: String,
    },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Rejected { status, .. } if *status == reqwest::StatusCode::NOT_FOUND)
    }

    /// Reason text from the server, if it gave one
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { detail, .. } => Some(detail),
            ClientError::Http(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `ws://` or `wss://` URL of the live feed for `id`
    pub fn feed_url(&self, id: GameId) -> String {
        let base = if let Some(rest) = self.base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base.clone()
        };
        format!("{base}/ws/board/{id}")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => status.to_string(),
        };
        Err(ClientError::Rejected { status, detail })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        Self::send(self.http.get(self.url(path))).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        Self::send(self.http.post(self.url(path)).json(body)).await
    }

    pub async fn create_game(&self, req: &CreateGameRequest) -> Result<SessionSnapshot, ClientError> {
        self.post("/api/games", req).await
    }

    pub async fn snapshot(&self, id: GameId) -> Result<SessionSnapshot, ClientError> {
        self.get(&format!("/api/board/{id}")).await
    }

    pub async fn timers(&self, id: GameId) -> Result<Timers, ClientError> {
        self.get(&format!("/api/timers/{id}")).await
    }

    pub async fn moves(&self, id: GameId, from: Pos, color: Color) -> Result<Destinations, ClientError> {
        self.get(&square_query("moves", id, from, color)).await
    }

    pub async fn captures(
        &self,
        id: GameId,
        from: Pos,
        color: Color,
    ) -> Result<Destinations, ClientError> {
        self.get(&square_query("captures", id, from, color)).await
    }

    pub async fn ply_snapshot(&self, id: GameId, index: usize) -> Result<PlySnapshot, ClientError> {
        self.get(&format!("/api/snapshot/{id}/{index}")).await
    }

    pub async fn submit_move(&self, id: GameId, req: &MoveRequest) -> Result<SessionSnapshot, ClientError> {
        self.post(&format!("/api/move/{id}"), req).await
    }

    pub async fn resign(&self, id: GameId, color: Color) -> Result<SessionSnapshot, ClientError> {
        self.post(&format!("/api/resign/{id}"), &ColorRequest { color })
            .await
    }

    pub async fn offer_draw(&self, id: GameId, color: Color) -> Result<SessionSnapshot, ClientError> {
        self.post(&format!("/api/draw_offer/{id}"), &ColorRequest { color })
            .await
    }

    pub async fn respond_draw(
        &self,
        id: GameId,
        color: Color,
        accept: bool,
    ) -> Result<SessionSnapshot, ClientError> {
        self.post(
            &format!("/api/draw_response/{id}"),
            &OfferResponse { color, accept },
        )
        .await
    }

    pub async fn check_timeout(&self, id: GameId) -> Result<SessionSnapshot, ClientError> {
        self.post(&format!("/api/check_timeout/{id}"), &()).await
    }

    pub async fn request_rematch(&self, id: GameId, color: Color) -> Result<RematchStatus, ClientError> {
        self.post(&format!("/api/rematch_request/{id}"), &ColorRequest { color })
            .await
    }

    pub async fn respond_rematch(
        &self,
        id: GameId,
        color: Color,
        accept: bool,
    ) -> Result<RematchStatus, ClientError> {
        self.post(
            &format!("/api/rematch_response/{id}"),
            &OfferResponse { color, accept },
        )
        .await
    }

    pub async fn current_game(&self, user: &str) -> Result<CurrentGame, ClientError> {
        self.get(&format!("/api/users/{user}/current")).await
    }

    pub async fn replay(&self, id: GameId) -> Result<RecordedGame, ClientError> {
        self.get(&format!("/api/replay/{id}")).await
    }

    pub async fn replay_at(&self, id: GameId, index: usize) -> Result<PlySnapshot, ClientError> {
        self.get(&format!("/api/replay/{id}/{index}")).await
    }
}

fn square_query(kind: &str, id: GameId, from: Pos, color: Color) -> String {
    format!(
        "/api/{kind}/{id}?row={}&col={}&color={}",
        from.row,
        from.col,
        color.as_str()
    )
}
