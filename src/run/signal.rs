use std::sync::Arc;

use tokio::sync::watch;

/// One-shot stop indicator shared by every worker of a single run.
///
/// Cloning hands out another reference to the same signal. A fresh signal is
/// created for each run; a closed signal never reopens.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Closes the signal. Returns `true` only for the call that performed the
    /// close; every later call is a no-op returning `false`.
    pub fn close(&self) -> bool {
        self.tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal is closed.
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        if rx.wait_for(|closed| *closed).await.is_err() {
            // Sender lives as long as `self`.
        }
    }
}
