use thiserror::Error;

use super::ValidationError;
use crate::run::RunPhase;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("A run is already active (phase: {phase}).")]
    AlreadyRunning { phase: RunPhase },
    #[error("Invalid run specification: {source}")]
    InvalidSpec {
        #[source]
        source: ValidationError,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}

impl RunError {
    #[must_use]
    pub const fn is_already_running(&self) -> bool {
        matches!(self, Self::AlreadyRunning { .. })
    }

    #[must_use]
    pub const fn is_invalid_spec(&self) -> bool {
        matches!(self, Self::InvalidSpec { .. })
    }
}

impl From<ValidationError> for RunError {
    fn from(source: ValidationError) -> Self {
        Self::InvalidSpec { source }
    }
}
