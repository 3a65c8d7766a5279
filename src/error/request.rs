use thiserror::Error;

/// Why a single virtual-user request did not succeed. Local to one worker
/// iteration; counted and logged, never propagated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RequestFailure {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed")]
    Connect,
    #[error("unexpected status {status}")]
    Status { status: u16 },
    #[error("failed to read response body")]
    Body,
    #[error("request failed")]
    Other,
}

impl RequestFailure {
    #[must_use]
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestFailure::Timeout
        } else if err.is_connect() {
            RequestFailure::Connect
        } else if err.is_body() || err.is_decode() {
            RequestFailure::Body
        } else if let Some(status) = err.status() {
            RequestFailure::Status {
                status: status.as_u16(),
            }
        } else {
            RequestFailure::Other
        }
    }
}
