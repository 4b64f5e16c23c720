// ABOUTME: Type-safe identifiers and validated domain names.
// ABOUTME: Phantom types keep runtime IDs apart; newtypes keep names path-safe.

mod container_name;
mod id;
mod unit_name;

pub use container_name::{ContainerName, ContainerNameError};
pub use id::{ContainerId, Id, ImageId, NetworkId};
pub use unit_name::{UnitName, UnitNameError};
