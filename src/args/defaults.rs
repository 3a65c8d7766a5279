pub(crate) const DEFAULT_USER_AGENT: &str = concat!("meteor-loadtest/", env!("CARGO_PKG_VERSION"));

/// Default control server bind address.
pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
