//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
mod parsers;
mod types;

#[cfg(test)]
mod tests;

pub use cli::ServerArgs;
pub use types::{PositiveU64, ShardingPolicy};

pub(crate) use defaults::DEFAULT_USER_AGENT;
pub(crate) use parsers::{parse_duration_value, parse_header};
