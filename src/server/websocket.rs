use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::stats::{StatsHub, WsObserver};

use super::http::parse_request_line;

const PEEK_BYTES: usize = 512;
const PEEK_ATTEMPTS: usize = 20;
const PEEK_BACKOFF: Duration = Duration::from_millis(5);

/// Reads the request line without consuming it, so the stream can still be
/// handed to either the WebSocket handshake or the plain HTTP reader.
pub(super) async fn peek_request_line(stream: &TcpStream) -> Option<(String, String)> {
    let mut buffer = [0u8; PEEK_BYTES];
    for _ in 0..PEEK_ATTEMPTS {
        let bytes = stream.peek(&mut buffer).await.ok()?;
        if bytes == 0 {
            return None;
        }
        let seen = buffer.get(..bytes)?;
        if let Some(end) = seen.windows(2).position(|window| window == b"\r\n") {
            let line = std::str::from_utf8(seen.get(..end)?).ok()?;
            let (method, path) = parse_request_line(line)?;
            return Some((method.to_owned(), path.to_owned()));
        }
        if bytes == PEEK_BYTES {
            return None;
        }
        tokio::time::sleep(PEEK_BACKOFF).await;
    }
    None
}

/// Upgrades the connection and keeps it joined to the hub until the peer
/// closes it or the hub drops it.
pub(super) async fn handle_observer_connection(stream: TcpStream, hub: &StatsHub) {
    let socket = match tokio_tungstenite::accept_async(stream).await {
        Ok(socket) => socket,
        Err(err) => {
            debug!("WebSocket handshake failed: {}", err);
            return;
        }
    };
    let (sink, mut source) = socket.split();
    let id = hub.join(WsObserver::new(sink));

    while let Some(frame) = source.next().await {
        match frame {
            Ok(message) if message.is_close() => break,
            Ok(message) => trace!("Ignoring {} byte frame from {}", message.len(), id),
            Err(err) => {
                debug!("{} read failed: {}", id, err);
                break;
            }
        }
    }

    if hub.leave(id) {
        debug!("{} left", id);
    }
}
