use clap::ArgMatches;
use clap::parser::ValueSource;
use std::time::Duration;

use crate::args::{PositiveU64, ServerArgs};
use crate::distributed::SlaveNode;
use crate::error::{AppError, AppResult, ConfigError};

use super::types::{ConfigFile, DurationValue};

/// Applies configuration values to server arguments.
///
/// Values given on the command line or through an environment variable win
/// over the file.
///
/// # Errors
///
/// Returns an error when a config value is invalid.
pub fn apply_config(
    args: &mut ServerArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_explicit(matches, "listen")
        && let Some(listen) = config.listen.as_ref()
    {
        args.listen.clone_from(listen);
    }

    if !is_explicit(matches, "slaves")
        && let Some(slaves) = config.slaves.as_ref()
    {
        for slave in slaves {
            SlaveNode::new(slave)
                .map_err(|err| AppError::config(ConfigError::InvalidSlave { source: err }))?;
        }
        args.slaves.clone_from(slaves);
    }

    if !is_explicit(matches, "sharding")
        && let Some(sharding) = config.sharding
    {
        args.sharding = sharding;
    }

    if !is_explicit(matches, "stats_interval_ms")
        && let Some(interval) = config.stats_interval_ms
    {
        args.stats_interval_ms = ensure_positive_u64(interval, "stats_interval_ms")?;
    }

    if !is_explicit(matches, "request_timeout")
        && let Some(timeout) = config.request_timeout.as_ref()
    {
        args.request_timeout = to_duration(timeout, "request_timeout")?;
    }

    if !is_explicit(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = to_duration(timeout, "connect_timeout")?;
    }

    if !is_explicit(matches, "slave_timeout")
        && let Some(timeout) = config.slave_timeout.as_ref()
    {
        args.slave_timeout = to_duration(timeout, "slave_timeout")?;
    }

    if !is_explicit(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    if !is_explicit(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}

fn is_explicit(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

fn ensure_positive_u64(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn to_duration(value: &DurationValue, field: &'static str) -> AppResult<Duration> {
    value
        .to_duration()
        .map_err(|err| AppError::config(ConfigError::InvalidDuration { field, source: err }))
}
