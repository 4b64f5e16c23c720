// ABOUTME: Error types for in-container execution and service control.
// ABOUTME: Non-zero exits carry the captured stderr.

use crate::runtime::{ContainerError, ExecError};

#[derive(Debug, thiserror::Error)]
pub enum GuestError {
    #[error("container {0} is not running")]
    ContainerNotRunning(String),

    #[error("exec failed (exit {exit_code}): {stderr}")]
    CommandFailed { exit_code: i64, stderr: String },

    #[error("service {unit} is {actual}, expected {expected}")]
    ServiceState {
        unit: String,
        expected: &'static str,
        actual: String,
    },

    #[error("failed to inspect container {id}: {source}")]
    Inspect {
        id: String,
        #[source]
        source: ContainerError,
    },

    #[error("exec in container {id} failed: {source}")]
    Exec {
        id: String,
        #[source]
        source: ExecError,
    },
}
