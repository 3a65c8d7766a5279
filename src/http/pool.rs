use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::issuer::{PreparedRequest, RequestIssuer};
use crate::run::{CancellationSignal, RunCounters};

/// Spawns the local virtual users of a run.
pub struct WorkerPool;

impl WorkerPool {
    /// Spawns exactly `user_count` workers. Each one loops "check the signal,
    /// issue one request" with no delay until the signal closes. The caller
    /// does not need to await the returned handles.
    #[must_use]
    pub fn launch(
        request: &Arc<PreparedRequest>,
        signal: &CancellationSignal,
        issuer: &Arc<dyn RequestIssuer>,
        counters: &Arc<RunCounters>,
        user_count: usize,
    ) -> Vec<JoinHandle<()>> {
        debug!("Launching {} virtual users", user_count);
        (0..user_count)
            .map(|id| {
                let worker = Worker {
                    id,
                    request: Arc::clone(request),
                    signal: signal.clone(),
                    issuer: Arc::clone(issuer),
                    counters: Arc::clone(counters),
                };
                tokio::spawn(worker.run())
            })
            .collect()
    }
}

struct Worker {
    id: usize,
    request: Arc<PreparedRequest>,
    signal: CancellationSignal,
    issuer: Arc<dyn RequestIssuer>,
    counters: Arc<RunCounters>,
}

impl Worker {
    async fn run(self) {
        trace!("Virtual user {} started", self.id);
        let mut issued: u64 = 0;

        while !self.signal.is_closed() {
            let outcome = self.issuer.issue(&self.request).await;
            let failure = outcome.failure();
            self.counters.record(failure);
            issued = issued.saturating_add(1);
            if let Some(failure) = failure {
                trace!(
                    "Virtual user {} request failed after {:?}: {}",
                    self.id,
                    outcome.elapsed(),
                    failure
                );
            }
            // Fast failures may never reach a pending I/O point.
            tokio::task::yield_now().await;
        }

        trace!("Virtual user {} stopped after {} requests", self.id, issued);
    }
}
