use super::{ConfigError, DistributedError, RunError, ValidationError};

impl From<&'static str> for ValidationError {
    fn from(message: &'static str) -> Self {
        ValidationError::TestExpectation { message }
    }
}

impl From<String> for ValidationError {
    fn from(value: String) -> Self {
        ValidationError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for ConfigError {
    fn from(message: &'static str) -> Self {
        ConfigError::TestExpectation { message }
    }
}

impl From<String> for ConfigError {
    fn from(value: String) -> Self {
        ConfigError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for RunError {
    fn from(message: &'static str) -> Self {
        RunError::TestExpectation { message }
    }
}

impl From<String> for RunError {
    fn from(value: String) -> Self {
        RunError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for DistributedError {
    fn from(message: &'static str) -> Self {
        DistributedError::TestExpectation { message }
    }
}

impl From<String> for DistributedError {
    fn from(value: String) -> Self {
        DistributedError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}
