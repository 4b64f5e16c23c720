// ABOUTME: Application-wide error types for nodeapi.
// ABOUTME: Unifies component errors and classifies them by kind for callers.

use std::path::PathBuf;
use thiserror::Error;

use crate::guest::GuestError;
use crate::lifecycle::LifecycleError;
use crate::node::NodeError;
use crate::provision::ProvisionError;
use crate::runtime::{ContainerError, ExecError, ImageError, NetworkError, RuntimeError};
use crate::status::StatusError;
use crate::types::{ContainerNameError, UnitNameError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Connection(#[from] RuntimeError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Guest(#[from] GuestError),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    ContainerName(#[from] ContainerNameError),

    #[error(transparent)]
    UnitName(#[from] UnitNameError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification a boundary layer maps onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    /// The target is not in a state the operation can act on.
    Precondition,
    Timeout,
    /// The runtime could not be reached.
    Unavailable,
    /// A command inside a container exited non-zero.
    CommandFailed,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    /// Process exit code used by the CLI.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::InvalidInput => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::Conflict => 4,
            ErrorKind::Precondition => 5,
            ErrorKind::Timeout => 6,
            ErrorKind::Unavailable => 7,
            ErrorKind::CommandFailed => 8,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConfigNotFound(_) | Error::InvalidConfig(_) | Error::Yaml(_) => {
                ErrorKind::InvalidInput
            }
            Error::ContainerName(_) | Error::UnitName(_) => ErrorKind::InvalidInput,
            Error::Io(_) => ErrorKind::Internal,
            Error::Connection(_) => ErrorKind::Unavailable,
            Error::Lifecycle(e) => lifecycle_kind(e),
            Error::Provision(e) => provision_kind(e),
            Error::Guest(e) => guest_kind(e),
            Error::Status(e) => status_kind(e),
            Error::Node(e) => node_kind(e),
        }
    }
}

fn container_kind(e: &ContainerError) -> ErrorKind {
    match e {
        ContainerError::NotFound(_) | ContainerError::ImageNotFound(_) => ErrorKind::NotFound,
        ContainerError::AlreadyExists(_) => ErrorKind::Conflict,
        ContainerError::NotRunning(_) | ContainerError::AlreadyRunning(_) => {
            ErrorKind::Precondition
        }
        ContainerError::InvalidConfig(_) => ErrorKind::InvalidInput,
        ContainerError::Runtime(_) => ErrorKind::Internal,
    }
}

fn exec_kind(e: &ExecError) -> ErrorKind {
    match e {
        ExecError::ContainerNotFound(_) | ExecError::ExecNotFound(_) => ErrorKind::NotFound,
        ExecError::ContainerNotRunning(_) => ErrorKind::Precondition,
        ExecError::Failed(_) => ErrorKind::CommandFailed,
        ExecError::Runtime(_) => ErrorKind::Internal,
    }
}

fn image_kind(e: &ImageError) -> ErrorKind {
    match e {
        ImageError::NotFound(_) => ErrorKind::NotFound,
        ImageError::InUse(_) => ErrorKind::Conflict,
        ImageError::Runtime(_) => ErrorKind::Internal,
    }
}

fn network_kind(e: &NetworkError) -> ErrorKind {
    match e {
        NetworkError::NotFound(_) | NetworkError::ContainerNotFound(_) => ErrorKind::NotFound,
        NetworkError::AlreadyExists(_) | NetworkError::InUse(_) => ErrorKind::Conflict,
        NetworkError::InvalidConfig(_) => ErrorKind::InvalidInput,
        NetworkError::Runtime(_) => ErrorKind::Internal,
    }
}

fn lifecycle_kind(e: &LifecycleError) -> ErrorKind {
    match e {
        LifecycleError::AlreadyInState { .. } | LifecycleError::NoNetworkSettings(_) => {
            ErrorKind::Precondition
        }
        LifecycleError::NameConflict(_) => ErrorKind::Conflict,
        LifecycleError::TransitionTimeout { .. } => ErrorKind::Timeout,
        LifecycleError::Runtime { source, .. } | LifecycleError::List(source) => {
            container_kind(source)
        }
        LifecycleError::InvalidName(_) => ErrorKind::InvalidInput,
        LifecycleError::RemoveFailed { .. } | LifecycleError::KernelRelease(_) => {
            ErrorKind::Internal
        }
        LifecycleError::Provision(e) => provision_kind(e),
    }
}

fn provision_kind(e: &ProvisionError) -> ErrorKind {
    match e {
        ProvisionError::RouteNotFound(_) => ErrorKind::NotFound,
        ProvisionError::InvalidRoute(_) => ErrorKind::InvalidInput,
        ProvisionError::Write { .. }
        | ProvisionError::Remove { .. }
        | ProvisionError::Reload { .. } => ErrorKind::Internal,
    }
}

fn guest_kind(e: &GuestError) -> ErrorKind {
    match e {
        GuestError::ContainerNotRunning(_) => ErrorKind::Precondition,
        GuestError::CommandFailed { .. } => ErrorKind::CommandFailed,
        GuestError::ServiceState { .. } => ErrorKind::Timeout,
        GuestError::Inspect { source, .. } => container_kind(source),
        GuestError::Exec { source, .. } => exec_kind(source),
    }
}

fn status_kind(e: &StatusError) -> ErrorKind {
    match e {
        StatusError::Host { .. } => ErrorKind::Internal,
        StatusError::HostTimeout(_) | StatusError::InventoryTimeout(_) => ErrorKind::Timeout,
        StatusError::Inventory(e) => lifecycle_kind(e),
    }
}

fn node_kind(e: &NodeError) -> ErrorKind {
    match e {
        NodeError::Lifecycle { source, .. } => lifecycle_kind(source),
        NodeError::Provision { source, .. } => provision_kind(source),
        NodeError::NoAddress(_) => ErrorKind::Precondition,
        NodeError::UnroutableName(_) => ErrorKind::InvalidInput,
        NodeError::Image(e) => image_kind(e),
        NodeError::Network(e) => network_kind(e),
        NodeError::Guest(e) => guest_kind(e),
        NodeError::Status(e) => status_kind(e),
    }
}
