// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Create, start, stop, remove, inspect, list, stats and wait.

use super::shared_types::{
    ContainerConfig, ContainerInfo, ContainerState, ContainerStats, RemoveOptions, RemoveReport,
    WaitCondition,
};
use crate::types::ContainerId;
use async_trait::async_trait;
use std::time::Duration;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Create a container from the given configuration. Does not start it.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError>;

    /// Ask the runtime to start a created or stopped container.
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Stop a running container, killing it after `timeout`.
    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError>;

    /// Remove a container, returning one report per removed container.
    async fn remove_container(
        &self,
        id: &ContainerId,
        opts: &RemoveOptions,
    ) -> Result<Vec<RemoveReport>, ContainerError>;

    /// Get detailed information about a container by ID or name.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError>;

    /// List containers matching the given filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;

    /// Take a single, non-streaming resource usage sample.
    async fn container_stats(&self, id: &ContainerId) -> Result<ContainerStats, ContainerError>;

    /// Resolve once the container reaches `condition`. Never times out on its
    /// own; callers bound it.
    async fn wait_container(
        &self,
        id: &ContainerId,
        condition: WaitCondition,
    ) -> Result<(), ContainerError>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Include stopped containers.
    pub all: bool,
}

impl ContainerFilters {
    pub fn all() -> Self {
        Self {
            all: true,
            ..Default::default()
        }
    }
}

/// Summary information about a container, as returned by a list call.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: ContainerId,
    /// Names as reported by the runtime, usually with a leading `/`.
    pub names: Vec<String>,
    pub image: String,
    pub state: ContainerState,
    pub status: String,
    /// Exposed container ports, deduplicated.
    pub ports: Vec<u16>,
    pub networks: Vec<String>,
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ContainerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContainerError::NotFound(_))
    }
}
