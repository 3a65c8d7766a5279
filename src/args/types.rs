use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

use crate::error::{AppError, ValidationError};

/// How a run's user count is shared across registered slaves.
#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShardingPolicy {
    /// Every slave runs the full requested user count.
    #[default]
    Replicate,
    /// The requested user count is split evenly across slaves.
    Divide,
}

impl ShardingPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ShardingPolicy::Replicate => "replicate",
            ShardingPolicy::Divide => "divide",
        }
    }
}

impl std::str::FromStr for ShardingPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "replicate" => Ok(ShardingPolicy::Replicate),
            "divide" => Ok(ShardingPolicy::Divide),
            _ => Err(AppError::validation(
                ValidationError::InvalidShardingPolicy {
                    value: s.to_owned(),
                },
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositiveU64(NonZeroU64);

impl PositiveU64 {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl TryFrom<u64> for PositiveU64 {
    type Error = ValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        NonZeroU64::new(value)
            .map(PositiveU64)
            .ok_or(ValidationError::ValueTooSmall { min: 1 })
    }
}

impl std::str::FromStr for PositiveU64 {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .parse()
            .map_err(|err| ValidationError::InvalidNumber { source: err })?;
        PositiveU64::try_from(value)
    }
}

impl From<PositiveU64> for u64 {
    fn from(value: PositiveU64) -> Self {
        value.get()
    }
}
