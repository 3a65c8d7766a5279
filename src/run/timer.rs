use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::spec::DurationUnit;

/// Single-shot deferred stop. Holds at most one pending invocation.
#[derive(Debug, Default)]
pub struct DurationTimer {
    handle: Option<JoinHandle<()>>,
    fired: Arc<AtomicBool>,
}

impl DurationTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer for `amount` of `unit`. Nothing is armed for a zero
    /// amount or [`DurationUnit::None`]; returns whether a timer was armed.
    pub fn arm<F, Fut>(&mut self, amount: u64, unit: DurationUnit, on_expiry: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        match unit.to_duration(amount) {
            Some(after) => {
                self.arm_after(after, on_expiry);
                true
            }
            None => false,
        }
    }

    /// Arms the timer to invoke `on_expiry` once after `after`, replacing any
    /// pending invocation.
    pub fn arm_after<F, Fut>(&mut self, after: Duration, on_expiry: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.disarm();
        let fired = Arc::new(AtomicBool::new(false));
        let task_fired = Arc::clone(&fired);
        self.fired = fired;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            task_fired.store(true, Ordering::Release);
            debug!("Duration timer expired after {:?}", after);
            // Detached so that disarming from inside the callback cannot abort it.
            drop(tokio::spawn(on_expiry()));
        }));
    }

    /// Cancels a pending invocation. Returns `true` if one was cancelled;
    /// disarming a fired or never-armed timer is a no-op.
    pub fn disarm(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        let pending = !self.fired.load(Ordering::Acquire);
        handle.abort();
        pending
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.handle.is_some() && !self.fired.load(Ordering::Acquire)
    }
}

impl Drop for DurationTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
