use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::args::ServerArgs;
use crate::distributed::SlaveRegistry;
use crate::error::{AppError, AppResult, ConfigError};
use crate::run::{RunCoordinator, RunSettings};
use crate::server::{ServerContext, bind, serve};
use crate::shutdown_handlers::{setup_signal_shutdown_handler, shutdown_channel};
use crate::stats::StatsHub;

pub(super) async fn run_server(args: ServerArgs) -> AppResult<()> {
    let registry = SlaveRegistry::from_addresses(&args.slaves)
        .map_err(|err| AppError::config(ConfigError::InvalidSlave { source: err }))?;
    let settings = RunSettings::from(&args);
    let coordinator = RunCoordinator::from_settings(&settings, registry)?;
    let hub = StatsHub::new(
        Arc::new(coordinator.clone()),
        Duration::from_millis(args.stats_interval_ms.get()),
    );

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let listener = bind(&args.listen).await?;
    let local_addr = listener.local_addr()?;
    info!(
        "Listening on {} ({} slaves, sharding={})",
        local_addr,
        coordinator.registry().len(),
        settings.sharding.as_str()
    );
    if coordinator.registry().is_empty() {
        info!("No slaves registered; runs execute locally");
    }

    serve(listener, ServerContext { coordinator, hub }, shutdown_rx).await;

    signal_handle.abort();
    if let Err(err) = signal_handle.await
        && !err.is_cancelled()
    {
        warn!("Signal handler failed: {}", err);
    }
    info!("Shutdown complete");
    Ok(())
}
