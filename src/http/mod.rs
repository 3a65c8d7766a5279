//! Request issuing and the local virtual-user pool.
mod client;
mod issuer;
mod pool;


pub(crate) use client::{build_control_client, build_load_client};
pub use issuer::{PreparedRequest, RequestIssuer, ReqwestIssuer};
pub use pool::WorkerPool;

#[cfg(test)]
pub(crate) use issuer::RequestOutcome;
