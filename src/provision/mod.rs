// ABOUTME: Host-side effects that accompany container lifecycle transitions.
// ABOUTME: Reverse-proxy routes, the proxy reload hook and per-container log directories.

mod error;
mod logdir;
mod reload;
mod routes;

pub use error::ProvisionError;
pub use logdir::LogLayout;
pub use reload::{ServiceReloader, SystemctlReloader};
pub use routes::{RouteProvisioner, RouteSpec};
