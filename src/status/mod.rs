// ABOUTME: Composite node status: host telemetry plus container inventory.
// ABOUTME: Both halves are fetched concurrently under independent deadlines.

mod host;

pub use host::LocalHostProbe;

use crate::config::StatusConfig;
use crate::lifecycle::{ContainerRecord, Coordinator, LifecycleError};
use crate::runtime::ContainerOps;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Host facts reported alongside the container inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostInfo {
    pub node_id: String,
    pub os_name: String,
    pub os_version: String,
    pub cpu_count: usize,
    pub cpu_percent: f64,
    pub mem_percent: f64,
    /// Bytes.
    pub total_memory: u64,
    pub num_containers: usize,
    /// Source address of the default route, empty if unknown.
    pub ip_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub host: HostInfo,
    pub containers: Vec<ContainerRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("failed to read {what}: {source}")]
    Host {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("host telemetry timed out after {0:?}")]
    HostTimeout(Duration),

    #[error("container inventory timed out after {0:?}")]
    InventoryTimeout(Duration),

    #[error(transparent)]
    Inventory(#[from] LifecycleError),
}

/// Source of host telemetry.
#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn host_info(&self) -> Result<HostInfo, StatusError>;
}

/// Host info and inventory together; fails as a whole if either half fails.
pub async fn node_status<R, H>(
    coordinator: &Coordinator,
    runtime: &R,
    probe: &H,
    config: &StatusConfig,
) -> Result<NodeStatus, StatusError>
where
    R: ContainerOps + ?Sized,
    H: HostProbe + ?Sized,
{
    let host = async {
        tokio::time::timeout(config.host_timeout, probe.host_info())
            .await
            .map_err(|_| StatusError::HostTimeout(config.host_timeout))?
    };
    let inventory = async {
        tokio::time::timeout(config.inventory_timeout, coordinator.list_containers(runtime))
            .await
            .map_err(|_| StatusError::InventoryTimeout(config.inventory_timeout))?
            .map_err(StatusError::from)
    };

    let (mut host, containers) = tokio::try_join!(host, inventory)?;
    host.num_containers = containers.len();
    Ok(NodeStatus { host, containers })
}
