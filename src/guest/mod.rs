// ABOUTME: Commands and service control inside running containers.
// ABOUTME: Exec sessions plus the managed-service surface built on them.

mod error;
mod executor;
mod services;

pub use error::GuestError;
pub use executor::{ExecResult, exec, run};
pub use services::{ManagedService, ServiceControl};
