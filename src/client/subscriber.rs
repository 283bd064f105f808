//! Reconnecting live feed for one game
//!
//! Every (re)connect opens the WebSocket first and then fetches a full
//! snapshot over HTTP, so nothing published in between is lost. A dropped
//! connection is retried with [`Backoff`]; it never ends the game.

use super::api::{ApiClient, ClientError};
use super::backoff::Backoff;
use futures::StreamExt;
use shared::{GameId, ServerEvent, SessionSnapshot};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use websocket::ClientBuilder;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Fresh snapshot fetched right after a (re)connect
    Connected(SessionSnapshot),
    Event(ServerEvent),
    /// The feed dropped; the next attempt starts after `retry_in`
    Disconnected { retry_in: Duration },
}

enum Ended {
    /// Connection lost; try again
    Dropped,
    /// Nobody is listening anymore, or the game is gone
    Stop,
}

pub struct Subscriber {
    api: ApiClient,
    id: GameId,
    backoff: Backoff,
}

impl Subscriber {
    pub fn new(api: ApiClient, id: GameId) -> Self {
        Self {
            api,
            id,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run the feed in the background. Dropping the receiver stops it.
    pub fn spawn(self, buffer: usize) -> (mpsc::Receiver<FeedEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer);
        let task = tokio::spawn(self.run(tx));
        (rx, task)
    }

    pub async fn run(mut self, tx: mpsc::Sender<FeedEvent>) {
        loop {
            match self.connect_once(&tx).await {
                Ok(Ended::Stop) => break,
                Ok(Ended::Dropped) => info!("feed for {} dropped", self.id),
                Err(err) if err.downcast_ref::<ClientError>().is_some_and(ClientError::is_not_found) => {
                    warn!("game {} no longer exists, stopping feed", self.id);
                    break;
                }
                Err(err) => warn!("feed for {} failed: {err:#}", self.id),
            }
            let retry_in = self.backoff.next_delay();
            if tx.send(FeedEvent::Disconnected { retry_in }).await.is_err() {
                break;
            }
            tokio::time::sleep(retry_in).await;
        }
        debug!("feed for {} stopped", self.id);
    }

    async fn connect_once(&mut self, tx: &mpsc::Sender<FeedEvent>) -> anyhow::Result<Ended> {
        let url = self.api.feed_url(self.id);
        let (mut stream, _) = match ClientBuilder::new().uri(&url)?.connect().await {
            Ok(connection) => connection,
            Err(err) => {
                // A missing game refuses the upgrade; HTTP tells the two apart
                self.api.snapshot(self.id).await?;
                return Err(err.into());
            }
        };

        let snapshot = self.api.snapshot(self.id).await?;
        self.backoff.reset();
        info!("feed for {} connected at ply {}", self.id, snapshot.ply());
        if tx.send(FeedEvent::Connected(snapshot)).await.is_err() {
            return Ok(Ended::Stop);
        }

        while let Some(frame) = stream.next().await {
            let message = frame?;
            if message.is_close() {
                break;
            }
            let Some(text) = message.as_text() else {
                continue;
            };
            match serde_json::from_str::<ServerEvent>(text) {
                Ok(event) => {
                    if tx.send(FeedEvent::Event(event)).await.is_err() {
                        return Ok(Ended::Stop);
                    }
                }
                Err(err) => debug!("ignoring unreadable event: {err}"),
            }
        }
        Ok(Ended::Dropped)
    }
}
