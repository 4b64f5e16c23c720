// ABOUTME: Container runtime access for Docker and Podman.
// ABOUTME: Endpoint detection, the bollard client and the shared connection.

mod bollard;
mod connection;
mod detection;
mod error;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use connection::ConnectionManager;
pub use detection::{default_socket_path, podman_socket_path, resolve_endpoint};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::*;
pub use types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};
