use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ValidationError;

/// Unit applied to a run's `duration`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    /// No timer; the run lasts until stopped.
    #[default]
    None,
    Seconds,
    Minutes,
}

impl DurationUnit {
    /// Converts `amount` of this unit into a wall-clock duration.
    ///
    /// Returns `None` for a zero amount or for [`DurationUnit::None`].
    #[must_use]
    pub fn to_duration(self, amount: u64) -> Option<Duration> {
        if amount == 0 {
            return None;
        }
        match self {
            DurationUnit::None => None,
            DurationUnit::Seconds => Some(Duration::from_secs(amount)),
            DurationUnit::Minutes => Some(Duration::from_secs(amount.saturating_mul(60))),
        }
    }
}

/// Everything a run needs: the target, the request template and the load shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub target_url: String,
    pub method: String,
    /// Ordered `name:value` entries.
    pub headers: Vec<String>,
    pub payload: Bytes,
    pub user_count: usize,
    pub duration: u64,
    pub duration_unit: DurationUnit,
}

impl RunSpec {
    /// A single-user `GET` run against `target_url` with no timer.
    #[must_use]
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            method: "GET".to_owned(),
            headers: Vec::new(),
            payload: Bytes::new(),
            user_count: 1,
            duration: 0,
            duration_unit: DurationUnit::None,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    #[must_use]
    pub fn with_users(mut self, user_count: usize) -> Self {
        self.user_count = user_count;
        self
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.headers.push(header.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    #[must_use]
    pub const fn with_duration(mut self, duration: u64, unit: DurationUnit) -> Self {
        self.duration = duration;
        self.duration_unit = unit;
        self
    }

    /// Wall-clock limit of the run, if it has one.
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.duration_unit.to_duration(self.duration)
    }
}

/// Headers as either a JSON array of `name:value` strings or a single
/// `;`-separated string.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum HeaderList {
    List(Vec<String>),
    Joined(String),
}

impl Default for HeaderList {
    fn default() -> Self {
        HeaderList::List(Vec::new())
    }
}

impl HeaderList {
    #[must_use]
    pub fn into_entries(self) -> Vec<String> {
        match self {
            HeaderList::List(entries) => entries
                .into_iter()
                .filter(|entry| !entry.trim().is_empty())
                .collect(),
            HeaderList::Joined(joined) => joined
                .split(';')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

fn default_method() -> String {
    "GET".to_owned()
}

/// JSON form of a [`RunSpec`], shared by the control API and the slave wire
/// protocol.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RunSpecMessage {
    #[serde(alias = "target_url")]
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HeaderList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_b64: Option<String>,
    #[serde(default, alias = "user_count")]
    pub users: usize,
    #[serde(default)]
    pub duration: u64,
    #[serde(default, alias = "format")]
    pub duration_unit: DurationUnit,
}

impl RunSpecMessage {
    /// Encodes `spec` for the wire with `users` as the user count.
    #[must_use]
    pub fn from_spec(spec: &RunSpec, users: usize) -> Self {
        Self {
            url: spec.target_url.clone(),
            method: spec.method.clone(),
            headers: HeaderList::List(spec.headers.clone()),
            payload: None,
            payload_b64: (!spec.payload.is_empty()).then(|| BASE64.encode(&spec.payload)),
            users,
            duration: spec.duration,
            duration_unit: spec.duration_unit,
        }
    }

    /// Decodes the message. `payload_b64` wins over `payload` when both are set.
    ///
    /// # Errors
    ///
    /// Returns an error when `payload_b64` is not valid base64.
    pub fn into_spec(self) -> Result<RunSpec, ValidationError> {
        let payload = match (self.payload_b64, self.payload) {
            (Some(encoded), _) => Bytes::from(
                BASE64
                    .decode(encoded.trim())
                    .map_err(|err| ValidationError::InvalidPayloadBase64 { source: err })?,
            ),
            (None, Some(text)) => Bytes::from(text),
            (None, None) => Bytes::new(),
        };
        Ok(RunSpec {
            target_url: self.url.trim().to_owned(),
            method: self.method,
            headers: self.headers.into_entries(),
            payload,
            user_count: self.users,
            duration: self.duration,
            duration_unit: self.duration_unit,
        })
    }
}
