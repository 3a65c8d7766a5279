mod app;
mod config;
mod distributed;
mod http;
mod request;
mod run;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use distributed::DistributedError;
pub use http::HttpError;
pub use request::RequestFailure;
pub use run::RunError;
pub use validation::ValidationError;
