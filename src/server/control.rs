use serde::{Deserialize, Serialize};

use crate::distributed::DispatchSummary;
use crate::error::{RunError, ValidationError};
use crate::run::StopOutcome;

#[derive(Debug)]
pub(super) struct ControlError {
    pub(super) status: u16,
    pub(super) message: String,
}

impl ControlError {
    pub(super) fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(super) fn not_found() -> Self {
        Self::new(404, "Not found")
    }

    pub(super) fn method_not_allowed(method: &str, path: &str) -> Self {
        Self::new(405, format!("Method {} not allowed on {}", method, path))
    }

    pub(super) fn invalid_json(err: &serde_json::Error) -> Self {
        Self::new(400, format!("Invalid JSON: {}", err))
    }
}

impl From<ValidationError> for ControlError {
    fn from(err: ValidationError) -> Self {
        Self::new(400, err.to_string())
    }
}

impl From<RunError> for ControlError {
    fn from(err: RunError) -> Self {
        let status = if err.is_already_running() { 409 } else { 400 };
        Self::new(status, err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub(super) struct StopResponse {
    pub(super) stopped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) slaves: Option<DispatchSummary>,
}

impl From<StopOutcome> for StopResponse {
    fn from(outcome: StopOutcome) -> Self {
        match outcome {
            StopOutcome::NotRunning => Self {
                stopped: false,
                run_id: None,
                slaves: None,
            },
            StopOutcome::Stopped { run_id, slaves } => Self {
                stopped: true,
                run_id: Some(run_id),
                slaves,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SlaveAddressRequest {
    pub(super) address: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SlavesResponse {
    pub(super) slaves: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SlaveChangeResponse {
    pub(super) address: String,
    pub(super) changed: bool,
    pub(super) slaves: usize,
}
