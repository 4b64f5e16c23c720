// ABOUTME: Network operations trait for container runtimes.
// ABOUTME: Create, list and remove networks; attach containers to them.

use super::shared_types::{NetworkConfig, NetworkSummary};
use crate::types::{ContainerId, NetworkId};
use async_trait::async_trait;

/// Network operations: create, list, remove, connect.
#[async_trait]
pub trait NetworkOps: Send + Sync {
    /// Create a network.
    async fn create_network(&self, config: &NetworkConfig) -> Result<NetworkId, NetworkError>;

    /// Remove a network by ID or name.
    async fn remove_network(&self, network: &str) -> Result<(), NetworkError>;

    /// List all networks.
    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, NetworkError>;

    /// Connect a container to a network.
    async fn connect_to_network(
        &self,
        container: &ContainerId,
        network: &str,
    ) -> Result<(), NetworkError>;
}

/// Errors from network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("network not found: {0}")]
    NotFound(String),

    #[error("network already exists: {0}")]
    AlreadyExists(String),

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("network in use, cannot remove: {0}")]
    InUse(String),

    #[error("invalid network configuration: {0}")]
    InvalidConfig(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
