use serde::{Deserialize, Serialize};

use crate::run::RunSpecMessage;

/// Node endpoint that accepts a [`StartMessage`].
pub const SLAVE_START_PATH: &str = "/slave/start";
/// Node endpoint that stops whatever the node is running. Takes no body.
pub const SLAVE_STOP_PATH: &str = "/slave/stop";

/// Sent by the master to each slave to start its share of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMessage {
    /// Run id on the master, for log correlation.
    pub run_id: String,
    pub spec: RunSpecMessage,
}

/// Slave reply to a start or stop call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlaveAck {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl SlaveAck {
    #[must_use]
    pub fn new(status: impl Into<String>, run_id: Option<String>) -> Self {
        Self {
            status: status.into(),
            run_id,
        }
    }
}
