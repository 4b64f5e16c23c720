// ABOUTME: Error types for container lifecycle coordination.
// ABOUTME: Precondition, timeout and wrapped runtime failures with operation context.

use crate::provision::ProvisionError;
use crate::runtime::{ContainerError, ContainerState, WaitCondition};
use crate::types::ContainerNameError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The container is already in the state the operation would produce.
    #[error("container {id} is already {state}")]
    AlreadyInState { id: String, state: ContainerState },

    #[error("a container named {0} already exists")]
    NameConflict(String),

    /// The runtime accepted the request but the state was not confirmed in time.
    #[error("container {id} did not become {condition} within {timeout:?}")]
    TransitionTimeout {
        id: String,
        condition: WaitCondition,
        timeout: Duration,
    },

    #[error("container {0} has no network settings")]
    NoNetworkSettings(String),

    #[error("failed to {op} container {id}: {source}")]
    Runtime {
        op: &'static str,
        id: String,
        #[source]
        source: ContainerError,
    },

    #[error("failed to list containers: {0}")]
    List(#[source] ContainerError),

    #[error("failed to remove container {id}: {message}")]
    RemoveFailed { id: String, message: String },

    #[error("invalid container name: {0}")]
    InvalidName(#[from] ContainerNameError),

    #[error("cannot determine host kernel release: {0}")]
    KernelRelease(#[source] std::io::Error),

    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

impl LifecycleError {
    pub(crate) fn runtime(op: &'static str, id: impl ToString, source: ContainerError) -> Self {
        LifecycleError::Runtime {
            op,
            id: id.to_string(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LifecycleError::Runtime { source, .. } if source.is_not_found()
        )
    }
}
