use serde::Deserialize;
use std::time::Duration;

use crate::args::{ShardingPolicy, parse_duration_value};
use crate::error::ValidationError;

/// File form of the server options; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub listen: Option<String>,
    pub slaves: Option<Vec<String>>,
    pub sharding: Option<ShardingPolicy>,
    pub stats_interval_ms: Option<u64>,
    pub request_timeout: Option<DurationValue>,
    pub connect_timeout: Option<DurationValue>,
    pub slave_timeout: Option<DurationValue>,
    pub verbose: Option<bool>,
    pub no_color: Option<bool>,
}

/// Either a bare number of seconds or a suffixed string such as `"250ms"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration_value(text),
        }
    }
}
