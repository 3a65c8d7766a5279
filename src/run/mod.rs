//! Run lifecycle: the specification of a run, its observable state, and the
//! coordinator that drives it.
mod coordinator;
mod signal;
mod spec;
mod state;
mod timer;

#[cfg(test)]
mod tests;

pub use coordinator::{RunCoordinator, RunSettings, StopOutcome};
pub use signal::CancellationSignal;
pub use spec::{RunSpec, RunSpecMessage};
pub use state::{RunCounters, RunPhase, RunState};

#[cfg(test)]
pub(crate) use spec::DurationUnit;
#[cfg(test)]
pub(crate) use state::RunMode;
