use std::time::Duration;

use reqwest::Client;

use crate::args::DEFAULT_USER_AGENT;
use crate::error::{AppError, AppResult, HttpError};

/// Idle connections kept per target host for virtual users.
const LOAD_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Client shared by every virtual user of a node.
pub(crate) fn build_load_client(
    request_timeout: Duration,
    connect_timeout: Duration,
) -> AppResult<Client> {
    Client::builder()
        .timeout(request_timeout)
        .connect_timeout(connect_timeout)
        .user_agent(DEFAULT_USER_AGENT)
        .tcp_nodelay(true)
        .pool_idle_timeout(Some(LOAD_POOL_IDLE_TIMEOUT))
        .build()
        .map_err(|err| AppError::http(HttpError::BuildClientFailed { source: err }))
}

/// Client used for node-to-node control calls.
pub(crate) fn build_control_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(DEFAULT_USER_AGENT)
        .build()
        .map_err(|err| AppError::http(HttpError::BuildClientFailed { source: err }))
}
