//! Master/slave load distribution: the slave registry, the wire messages
//! exchanged with slave nodes, and the fan-out coordinator.
mod coordinator;
mod protocol;
mod registry;
mod summary;


pub use coordinator::SlaveCoordinator;
pub use protocol::{SLAVE_START_PATH, SLAVE_STOP_PATH, SlaveAck, StartMessage};
pub use registry::{SlaveNode, SlaveRegistry};
pub use summary::DispatchSummary;
