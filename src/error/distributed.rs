use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistributedError {
    #[error("Slave {addr} unreachable: {source}")]
    SlaveUnreachable {
        addr: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Slave {addr} rejected the request with status {status}: {message}")]
    SlaveRejected {
        addr: String,
        status: u16,
        message: String,
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
