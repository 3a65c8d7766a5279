use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::args::{ServerArgs, ShardingPolicy};
use crate::distributed::{DispatchSummary, SlaveCoordinator, SlaveNode, SlaveRegistry};
use crate::error::{AppResult, RunError};
use crate::http::{
    PreparedRequest, RequestIssuer, ReqwestIssuer, WorkerPool, build_control_client,
    build_load_client,
};

use super::signal::CancellationSignal;
use super::spec::RunSpec;
use super::state::{RunCounters, RunMode, RunPhase, RunState};
use super::timer::DurationTimer;

/// Node-level knobs that are not part of an individual run.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub sharding: ShardingPolicy,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub slave_timeout: Duration,
}

impl From<&ServerArgs> for RunSettings {
    fn from(args: &ServerArgs) -> Self {
        Self {
            sharding: args.sharding,
            request_timeout: args.request_timeout,
            connect_timeout: args.connect_timeout,
            slave_timeout: args.slave_timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub run_id: String,
    pub mode: RunMode,
    pub users: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchSummary>,
}

#[derive(Debug, Clone)]
pub enum StopOutcome {
    /// Nothing was running; stop is a no-op.
    NotRunning,
    Stopped {
        run_id: String,
        slaves: Option<DispatchSummary>,
    },
}

impl StopOutcome {
    #[must_use]
    pub const fn stopped(&self) -> bool {
        matches!(self, StopOutcome::Stopped { .. })
    }
}

/// Drives the Idle → Running → Stopping → Idle lifecycle.
///
/// Cloning is cheap and every clone drives the same state. Start and stop are
/// serialized against each other; [`RunCoordinator::snapshot`] never waits on
/// them.
#[derive(Clone)]
pub struct RunCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    control: Mutex<Control>,
    state_tx: watch::Sender<RunState>,
    /// Counters of the current or last local run. Replaced per run so that
    /// workers of a stopped run cannot count into the next one.
    counters: watch::Sender<Arc<RunCounters>>,
    issuer: Arc<dyn RequestIssuer>,
    slaves: SlaveCoordinator,
    registry: SlaveRegistry,
}

#[derive(Default)]
struct Control {
    active: Option<ActiveRun>,
    timer: DurationTimer,
}

struct ActiveRun {
    run_id: String,
    signal: CancellationSignal,
    /// Nodes that were sent this run; empty for a local run.
    nodes: Vec<SlaveNode>,
}

impl RunCoordinator {
    #[must_use]
    pub fn new(
        issuer: Arc<dyn RequestIssuer>,
        slaves: SlaveCoordinator,
        registry: SlaveRegistry,
    ) -> Self {
        let (state_tx, _) = watch::channel(RunState::default());
        let (counters, _) = watch::channel(Arc::new(RunCounters::default()));
        Self {
            inner: Arc::new(Inner {
                control: Mutex::new(Control::default()),
                state_tx,
                counters,
                issuer,
                slaves,
                registry,
            }),
        }
    }

    /// Builds a coordinator with the reqwest issuer and slave client.
    ///
    /// # Errors
    ///
    /// Returns an error when an HTTP client cannot be built.
    pub fn from_settings(settings: &RunSettings, registry: SlaveRegistry) -> AppResult<Self> {
        let load_client = build_load_client(settings.request_timeout, settings.connect_timeout)?;
        let control_client = build_control_client(settings.slave_timeout)?;
        Ok(Self::new(
            Arc::new(ReqwestIssuer::new(load_client)),
            SlaveCoordinator::new(control_client, settings.sharding),
            registry,
        ))
    }

    #[must_use]
    pub fn registry(&self) -> &SlaveRegistry {
        &self.inner.registry
    }

    /// Starts a run, fanning it out to the registered slaves when there are
    /// any.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::AlreadyRunning`] when a run is active and
    /// [`RunError::InvalidSpec`] when `spec` does not validate. Neither
    /// changes state.
    pub async fn start(&self, spec: RunSpec) -> Result<StartOutcome, RunError> {
        let mut control = self.inner.control.lock().await;
        self.ensure_idle(&control)?;
        let request = PreparedRequest::from_spec(&spec)?;
        let nodes = self.inner.registry.nodes();
        Ok(self.launch(&mut control, spec, request, nodes).await)
    }

    /// Starts a run on this node only, ignoring registered slaves. Used when
    /// this node is itself acting as a slave.
    ///
    /// # Errors
    ///
    /// Same as [`RunCoordinator::start`].
    pub async fn start_local(&self, spec: RunSpec) -> Result<StartOutcome, RunError> {
        let mut control = self.inner.control.lock().await;
        self.ensure_idle(&control)?;
        let request = PreparedRequest::from_spec(&spec)?;
        Ok(self.launch(&mut control, spec, request, Vec::new()).await)
    }

    /// Stops the active run. Workers are not awaited; they observe the
    /// closed signal between requests.
    pub async fn stop(&self) -> StopOutcome {
        let mut control = self.inner.control.lock().await;
        self.stop_locked(&mut control).await
    }

    /// Current state. Never waits on start/stop.
    #[must_use]
    pub fn snapshot(&self) -> RunState {
        let mut state = self.inner.state_tx.borrow().clone();
        state.slave_count = self.inner.registry.len();
        let counters = Arc::clone(&self.inner.counters.borrow());
        state.requests_sent = counters.sent();
        state.requests_failed = counters.failed();
        state
    }

    /// Receiver notified on every phase transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.inner.state_tx.subscribe()
    }

    fn ensure_idle(&self, control: &Control) -> Result<(), RunError> {
        let phase = self.inner.state_tx.borrow().phase;
        if control.active.is_some() || phase != RunPhase::Idle {
            return Err(RunError::AlreadyRunning { phase });
        }
        Ok(())
    }

    async fn launch(
        &self,
        control: &mut Control,
        spec: RunSpec,
        request: PreparedRequest,
        nodes: Vec<SlaveNode>,
    ) -> StartOutcome {
        let run_id = build_run_id();
        let signal = CancellationSignal::new();
        let mode = if nodes.is_empty() {
            RunMode::Local
        } else {
            RunMode::Distributed
        };

        let counters = Arc::new(RunCounters::default());
        self.inner.counters.send_replace(Arc::clone(&counters));
        let started_at = chrono::Utc::now().timestamp_millis();
        self.inner.state_tx.send_modify(|state| {
            state.phase = RunPhase::Running;
            state.active_user_count = spec.user_count;
            state.start_timestamp_ms = started_at;
            state.run_id = Some(run_id.clone());
            state.mode = Some(mode);
        });

        if let Some(limit) = spec.time_limit() {
            let weak = Arc::downgrade(&self.inner);
            let expiring_run = run_id.clone();
            control.timer.arm_after(limit, move || async move {
                stop_expired(weak, expiring_run).await;
            });
            debug!("Run {} will stop after {:?}", run_id, limit);
        } else if spec.duration > 0 {
            warn!(
                "Run {} has a duration but no unit; it runs until stopped",
                run_id
            );
        }

        let dispatch = match mode {
            RunMode::Local => {
                info!(
                    "Run {} started: {} users, {} {}",
                    run_id, spec.user_count, request.method, request.url
                );
                drop(WorkerPool::launch(
                    &Arc::new(request),
                    &signal,
                    &self.inner.issuer,
                    &counters,
                    spec.user_count,
                ));
                None
            }
            RunMode::Distributed => {
                info!(
                    "Run {} dispatching to {} slaves ({} sharding)",
                    run_id,
                    nodes.len(),
                    self.inner.slaves.sharding().as_str()
                );
                let summary = self.inner.slaves.dispatch(&run_id, &spec, &nodes).await;
                if !summary.is_complete() {
                    warn!(
                        "Run {}: {} of {} slaves failed to start",
                        run_id,
                        summary.failed.len(),
                        nodes.len()
                    );
                }
                Some(summary)
            }
        };

        control.active = Some(ActiveRun {
            run_id: run_id.clone(),
            signal,
            nodes,
        });

        StartOutcome {
            run_id,
            mode,
            users: spec.user_count,
            dispatch,
        }
    }

    async fn stop_locked(&self, control: &mut Control) -> StopOutcome {
        let Some(active) = control.active.take() else {
            debug!("Stop requested while idle");
            return StopOutcome::NotRunning;
        };

        self.inner
            .state_tx
            .send_modify(|state| state.phase = RunPhase::Stopping);
        if active.signal.close() {
            debug!("Run {} cancellation signal closed", active.run_id);
        }
        if control.timer.disarm() {
            debug!("Run {} duration timer disarmed", active.run_id);
        }

        let slaves = if active.nodes.is_empty() {
            None
        } else {
            Some(self.inner.slaves.stop_all(&active.nodes).await)
        };

        self.inner.state_tx.send_modify(|state| {
            state.phase = RunPhase::Idle;
            state.active_user_count = 0;
            state.start_timestamp_ms = 0;
            state.run_id = None;
            state.mode = None;
        });
        info!("Run {} stopped", active.run_id);

        StopOutcome::Stopped {
            run_id: active.run_id,
            slaves,
        }
    }
}

/// Timer path: stops `run_id` if it is still the active run.
async fn stop_expired(inner: Weak<Inner>, run_id: String) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let coordinator = RunCoordinator { inner };
    let mut control = coordinator.inner.control.lock().await;
    let is_current = control
        .active
        .as_ref()
        .is_some_and(|active| active.run_id == run_id);
    if !is_current {
        debug!("Ignoring expired timer for finished run {}", run_id);
        return;
    }
    info!("Run {} reached its duration", run_id);
    drop(coordinator.stop_locked(&mut control).await);
}

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn build_run_id() -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let sequence = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", now, std::process::id(), sequence)
}
