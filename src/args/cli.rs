use clap::Parser;
use std::time::Duration;

use super::defaults::DEFAULT_LISTEN;
use super::parsers::{parse_duration_arg, parse_positive_u64};
use super::types::{PositiveU64, ShardingPolicy};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Distributed HTTP burst load generator - concurrent virtual users, master/slave fan-out, timed runs, and live WebSocket run stats.",
    next_help_heading = "Advanced Options"
)]
pub struct ServerArgs {
    /// Address the control server listens on
    #[arg(
        long,
        short = 'l',
        default_value = DEFAULT_LISTEN,
        env = "METEOR_LISTEN",
        help_heading = "Common Options"
    )]
    pub listen: String,

    /// Slave node address (host:port), repeatable
    #[arg(
        long = "slave",
        short = 's',
        env = "METEOR_SLAVES",
        value_delimiter = ',',
        help_heading = "Common Options"
    )]
    pub slaves: Vec<String>,

    /// How the requested user count is shared across slaves
    #[arg(long, default_value = "replicate", value_enum, ignore_case = true)]
    pub sharding: ShardingPolicy,

    /// Interval between run-state pushes to live observers (ms)
    #[arg(long = "stats-interval-ms", default_value = "1000", value_parser = parse_positive_u64)]
    pub stats_interval_ms: PositiveU64,

    /// Per-request timeout for virtual users (e.g. 10s, 500ms)
    #[arg(long = "request-timeout", default_value = "10s", value_parser = parse_duration_arg)]
    pub request_timeout: Duration,

    /// Connect timeout for virtual users (e.g. 5s)
    #[arg(long = "connect-timeout", default_value = "5s", value_parser = parse_duration_arg)]
    pub connect_timeout: Duration,

    /// Timeout for start/stop calls to slave nodes (e.g. 5s)
    #[arg(long = "slave-timeout", default_value = "5s", value_parser = parse_duration_arg)]
    pub slave_timeout: Duration,

    /// Path to a TOML or JSON config file (defaults to meteor.toml / meteor.json)
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', help_heading = "Common Options")]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,
}
