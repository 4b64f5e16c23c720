// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ContainerOps, ExecOps, ImageOps, NetworkOps, RuntimeInfo.

mod container;
mod exec;
mod image;
mod network;
mod runtime_info;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use exec::{ExecError, ExecOps};
pub use image::{ImageError, ImageOps};
pub use network::{NetworkError, NetworkOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Every capability a node needs from its runtime.
pub trait FullRuntime: ContainerOps + ExecOps + ImageOps + NetworkOps + RuntimeInfo {}

impl<T> FullRuntime for T where T: ContainerOps + ExecOps + ImageOps + NetworkOps + RuntimeInfo {}
