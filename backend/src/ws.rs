//! Live board feed over WebSocket
//!
//! Each connection gets the current snapshot on open, then every event the
//! session broadcasts. Commands sent over the socket go through the same
//! dispatch path as HTTP; rejections are answered on that connection only.

use crate::api::{execute, fresh_snapshot, AppState};
use crate::error::ApiError;
use crate::session::Command;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use shared::{ClientMessage, GameId, ServerEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use web_time::Instant;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<GameId>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    if state.directory.get(id).is_none() {
        return Err(ApiError::NotFound);
    }
    Ok(ws.on_upgrade(move |socket| serve(socket, state, id)))
}

async fn serve(socket: WebSocket, state: AppState, id: GameId) {
    let Some(handle) = state.directory.get(id) else {
        return;
    };
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before the first snapshot so nothing falls in between
    let mut events = handle.subscribe();
    info!("subscriber joined game {id} ({} live)", handle.subscriber_count());

    let initial = match fresh_snapshot(&state, id).await {
        Ok(snapshot) => ServerEvent::Snapshot(snapshot),
        Err(err) => ServerEvent::Rejected {
            reason: err.to_string(),
        },
    };
    if send(&mut sender, &initial).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if send(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("subscriber on {id} skipped {skipped} events");
                    let latest = ServerEvent::Snapshot(handle.view().at(Instant::now()));
                    if send(&mut sender, &latest).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = next_text(&mut receiver) => match incoming {
                Some(text) => {
                    if let Some(reply) = handle_text(&state, id, &text).await {
                        if send(&mut sender, &reply).await.is_err() {
                            break;
                        }
                    }
                }
                None => break,
            },
        }
    }
    info!("subscriber left game {id}");
}

/// Next text frame, `None` once the peer is gone
async fn next_text(receiver: &mut SplitStream<WebSocket>) -> Option<String> {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(text.to_string()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}

/// Answer for this connection alone, if any
async fn handle_text(state: &AppState, id: GameId, text: &str) -> Option<ServerEvent> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            warn!("bad message on {id}: {err}");
            return Some(ServerEvent::Rejected {
                reason: format!("malformed message: {err}"),
            });
        }
    };
    let command = match message {
        ClientMessage::Sync => {
            return Some(match fresh_snapshot(state, id).await {
                Ok(snapshot) => ServerEvent::Snapshot(snapshot),
                Err(err) => ServerEvent::Rejected {
                    reason: err.to_string(),
                },
            });
        }
        ClientMessage::SubmitMove(req) => Command::from(req),
        ClientMessage::Resign { color } => Command::Resign { color },
        ClientMessage::OfferDraw { color } => Command::OfferDraw { color },
        ClientMessage::RespondDraw { color, accept } => Command::RespondDraw { color, accept },
        ClientMessage::CheckTimeout => Command::CheckTimeout,
        ClientMessage::RequestRematch { color } => Command::RequestRematch { color },
        ClientMessage::RespondRematch { color, accept } => {
            Command::RespondRematch { color, accept }
        }
    };
    // Accepted commands reach this socket through the broadcast
    match execute(state, id, command).await {
        Ok(_) => None,
        Err(err) => Some(ServerEvent::Rejected {
            reason: err.to_string(),
        }),
    }
}

async fn send(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            warn!("failed to encode event: {err}");
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await
}
