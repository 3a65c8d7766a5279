use async_trait::async_trait;
use futures_util::{Sink, SinkExt};
use thiserror::Error;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::debug;

use crate::run::RunState;

/// The peer went away. An expected lifecycle event, not a failure of the hub.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("observer disconnected")]
pub struct ObserverDisconnect;

/// Send half of a live observer connection.
#[async_trait]
pub trait ObserverConnection: Send + 'static {
    async fn push(&mut self, snapshot: &RunState) -> Result<(), ObserverDisconnect>;

    /// Closes the send path. Called once when the hub drops the observer.
    async fn close(&mut self) {}
}

/// Observer behind a WebSocket sink; each snapshot is one JSON text frame.
pub struct WsObserver<S> {
    sink: S,
}

impl<S> WsObserver<S> {
    pub const fn new(sink: S) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl<S> ObserverConnection for WsObserver<S>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin + Send + 'static,
{
    async fn push(&mut self, snapshot: &RunState) -> Result<(), ObserverDisconnect> {
        let text = serde_json::to_string(snapshot).map_err(|err| {
            debug!("Failed to encode snapshot: {}", err);
            ObserverDisconnect
        })?;
        self.sink.send(Message::Text(text)).await.map_err(|err| {
            debug!("WebSocket send failed: {}", err);
            ObserverDisconnect
        })
    }

    async fn close(&mut self) {
        if let Err(err) = self.sink.close().await {
            debug!("WebSocket close failed: {}", err);
        }
    }
}
