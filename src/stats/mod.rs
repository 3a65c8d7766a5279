//! Live run-state push to connected observers.
mod connection;
mod hub;


pub use connection::WsObserver;
pub use hub::StatsHub;
