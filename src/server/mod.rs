//! JSON control API and the `/join` live-stats WebSocket.
mod control;
mod http;
mod routes;
mod websocket;


use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, HttpError};
use crate::run::RunCoordinator;
use crate::shutdown::ShutdownReceiver;
use crate::stats::StatsHub;

use routes::{JOIN_PATH, handle_control_connection};
use websocket::{handle_observer_connection, peek_request_line};

/// Handles shared by every connection task.
#[derive(Clone)]
pub struct ServerContext {
    pub coordinator: RunCoordinator,
    pub hub: StatsHub,
}

/// Binds the control listener.
///
/// # Errors
///
/// Returns an error when the address cannot be bound.
pub async fn bind(addr: &str) -> AppResult<TcpListener> {
    TcpListener::bind(addr).await.map_err(|err| {
        AppError::http(HttpError::Bind {
            addr: addr.to_owned(),
            source: err,
        })
    })
}

/// Accepts connections until shutdown, then stops the active run and closes
/// every observer.
pub async fn serve(
    listener: TcpListener,
    context: ServerContext,
    mut shutdown_rx: ShutdownReceiver,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Connection from {}", peer);
                    let context = context.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, &context).await;
                    });
                }
                Err(err) => {
                    warn!("Failed to accept connection: {}", err);
                }
            },
        }
    }

    info!("Control server shutting down");
    if context.coordinator.stop().await.stopped() {
        info!("Stopped active run on shutdown");
    }
    context.hub.close_all();
}

async fn handle_connection(stream: TcpStream, context: &ServerContext) {
    let is_join = peek_request_line(&stream)
        .await
        .is_some_and(|(method, path)| method == "GET" && path == JOIN_PATH);
    if is_join {
        handle_observer_connection(stream, &context.hub).await;
    } else {
        handle_control_connection(stream, context).await;
    }
}
