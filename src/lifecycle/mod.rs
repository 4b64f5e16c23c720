// ABOUTME: Container lifecycle coordination and inventory.
// ABOUTME: Bounded, confirmed transitions serialized per container.

mod coordinator;
mod error;
mod listing;
mod locks;
mod probe;
mod record;

pub(crate) use coordinator::parse_ip;
pub use coordinator::Coordinator;
pub use error::LifecycleError;
pub use probe::DEFAULT_PROBE_IMAGE;
pub use record::{ContainerRecord, CreateOptions, TransitionResult};
