use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::connection::ObserverConnection;
use crate::run::{RunCoordinator, RunState};

/// Anything that can produce the current run state without blocking.
pub trait SnapshotSource: Send + Sync + 'static {
    fn snapshot(&self) -> RunState;
}

impl SnapshotSource for RunCoordinator {
    fn snapshot(&self) -> RunState {
        RunCoordinator::snapshot(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Registry of live observers. Each observer has its own push loop; there is
/// no coordinated broadcast and no backlog, so a slow observer simply sees
/// fewer snapshots.
#[derive(Clone)]
pub struct StatsHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    source: Arc<dyn SnapshotSource>,
    interval: Duration,
    next_id: AtomicU64,
    observers: Mutex<HashMap<ObserverId, oneshot::Sender<()>>>,
}

impl HubInner {
    fn take(&self, id: ObserverId) -> Option<oneshot::Sender<()>> {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }
}

impl StatsHub {
    #[must_use]
    pub fn new(source: Arc<dyn SnapshotSource>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(HubInner {
                source,
                interval,
                next_id: AtomicU64::new(0),
                observers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers `connection` and starts pushing snapshots to it, the first
    /// one immediately. The observer is dropped when a push fails or on
    /// [`StatsHub::leave`].
    pub fn join<C>(&self, connection: C) -> ObserverId
    where
        C: ObserverConnection,
    {
        let id = ObserverId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (close_tx, close_rx) = oneshot::channel();
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, close_tx);
        debug!("{} joined", id);

        tokio::spawn(push_loop(
            id,
            connection,
            Arc::clone(&self.inner.source),
            self.inner.interval,
            close_rx,
            Arc::downgrade(&self.inner),
        ));
        id
    }

    /// Closes an observer's send path. Returns `false` if it was already gone.
    pub fn leave(&self, id: ObserverId) -> bool {
        match self.inner.take(id) {
            Some(close_tx) => {
                if close_tx.send(()).is_err() {
                    // Push loop already exited.
                }
                true
            }
            None => false,
        }
    }

    /// Closes every observer.
    pub fn close_all(&self) {
        let drained: Vec<oneshot::Sender<()>> = self
            .inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, close_tx)| close_tx)
            .collect();
        debug!("Closing {} observers", drained.len());
        for close_tx in drained {
            if close_tx.send(()).is_err() {
                // Push loop already exited.
            }
        }
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

async fn push_loop<C>(
    id: ObserverId,
    mut connection: C,
    source: Arc<dyn SnapshotSource>,
    interval: Duration,
    mut close_rx: oneshot::Receiver<()>,
    hub: Weak<HubInner>,
) where
    C: ObserverConnection,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _closed = &mut close_rx => {
                connection.close().await;
                debug!("{} closed", id);
                break;
            }
            _instant = ticker.tick() => {
                let snapshot = source.snapshot();
                if connection.push(&snapshot).await.is_err() {
                    debug!("{} disconnected", id);
                    break;
                }
            }
        }
    }

    if let Some(hub) = hub.upgrade() {
        drop(hub.take(id));
    }
}
