// ABOUTME: Node facade composing lifecycle, provisioning, guest control and status.
// ABOUTME: Each workflow bundles a transition with the side effects that must follow it.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, StatusConfig};
use crate::guest::{self, ExecResult, GuestError, ManagedService, ServiceControl};
use crate::lifecycle::{
    ContainerRecord, Coordinator, CreateOptions, LifecycleError, TransitionResult, parse_ip,
};
use crate::provision::{
    LogLayout, ProvisionError, RouteProvisioner, ServiceReloader, SystemctlReloader,
};
use crate::runtime::{
    FullRuntime, ImageError, ImageSummary, NetworkConfig, NetworkError, NetworkSummary,
};
use crate::status::{self, HostProbe, NodeStatus, StatusError};
use crate::types::{ContainerId, ContainerName, NetworkId, UnitName};

/// Errors from multi-step node workflows, tagged with the step that failed.
///
/// Steps completed before the failure are not rolled back.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("{step}: {source}")]
    Lifecycle {
        step: &'static str,
        #[source]
        source: LifecycleError,
    },

    #[error("{step}: {source}")]
    Provision {
        step: &'static str,
        #[source]
        source: ProvisionError,
    },

    #[error("container {0} has no routable address")]
    NoAddress(String),

    #[error("container name {0:?} cannot be used as a route path")]
    UnroutableName(String),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Guest(#[from] GuestError),

    #[error(transparent)]
    Status(#[from] StatusError),
}

fn lifecycle(step: &'static str) -> impl FnOnce(LifecycleError) -> NodeError {
    move |source| NodeError::Lifecycle { step, source }
}

fn provision(step: &'static str) -> impl FnOnce(ProvisionError) -> NodeError {
    move |source| NodeError::Provision { step, source }
}

/// Everything this node can do, bound to one runtime connection.
pub struct Node<R: ?Sized, L = SystemctlReloader> {
    runtime: Arc<R>,
    coordinator: Coordinator,
    routes: RouteProvisioner<L>,
    services: ServiceControl,
    status: StatusConfig,
}

impl<R> Node<R, SystemctlReloader>
where
    R: FullRuntime + ?Sized,
{
    pub fn from_config(runtime: Arc<R>, config: &Config) -> Self {
        Node::new(
            runtime,
            Coordinator::new(config.lifecycle.clone(), LogLayout::new(&config.logs)),
            RouteProvisioner::new(config.proxy.clone()),
            ServiceControl::new(config.services.clone()),
            config.status.clone(),
        )
    }
}

impl<R, L> Node<R, L>
where
    R: FullRuntime + ?Sized,
    L: ServiceReloader,
{
    pub fn new(
        runtime: Arc<R>,
        coordinator: Coordinator,
        routes: RouteProvisioner<L>,
        services: ServiceControl,
        status: StatusConfig,
    ) -> Self {
        Self {
            runtime,
            coordinator,
            routes,
            services,
            status,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn routes(&self) -> &RouteProvisioner<L> {
        &self.routes
    }

    // =========================================================================
    // Containers
    // =========================================================================

    pub async fn list_containers(&self) -> Result<Vec<ContainerRecord>, NodeError> {
        self.coordinator
            .list_containers(&*self.runtime)
            .await
            .map_err(lifecycle("list containers"))
    }

    pub async fn container_name(&self, id: &ContainerId) -> Result<String, NodeError> {
        self.coordinator
            .inspect_name(&*self.runtime, id)
            .await
            .map_err(lifecycle("inspect"))
    }

    pub async fn container_ip(&self, id: &ContainerId) -> Result<String, NodeError> {
        self.coordinator
            .inspect_ip(&*self.runtime, id)
            .await
            .map_err(lifecycle("inspect"))
    }

    pub async fn create(
        &self,
        image: &str,
        name: &ContainerName,
        options: &CreateOptions,
    ) -> Result<ContainerId, NodeError> {
        self.coordinator
            .create_container(&*self.runtime, image, name, options)
            .await
            .map_err(lifecycle("create"))
    }

    pub async fn stop(&self, id: &ContainerId) -> Result<TransitionResult, NodeError> {
        self.coordinator
            .stop_container(&*self.runtime, id)
            .await
            .map_err(lifecycle("stop"))
    }

    /// Create, start and route a container.
    pub async fn launch(
        &self,
        image: &str,
        name: &ContainerName,
        options: &CreateOptions,
    ) -> Result<ContainerId, NodeError> {
        let id = self.create(image, name, options).await?;
        self.start_routed(&id, name).await?;
        Ok(id)
    }

    /// Create, start and route an eBPF probe container.
    pub async fn launch_probe(
        &self,
        image: Option<&str>,
        name: Option<ContainerName>,
        options: &CreateOptions,
    ) -> Result<ContainerId, NodeError> {
        let id = self
            .coordinator
            .create_probe_container(&*self.runtime, image, name, options)
            .await
            .map_err(lifecycle("create"))?;
        let name = self.routable_name(&id).await?;
        self.start_routed(&id, &name).await?;
        Ok(id)
    }

    /// Start a container and route its ports under its name.
    pub async fn start_and_route(&self, id: &ContainerId) -> Result<TransitionResult, NodeError> {
        let name = self.routable_name(id).await?;
        self.start_routed(id, &name).await
    }

    /// Remove a container, then its route, then its log directory.
    ///
    /// A container that was never routed has no route to retract.
    pub async fn decommission(&self, id: &ContainerId, name: &ContainerName) -> Result<(), NodeError> {
        self.coordinator
            .remove_container(&*self.runtime, id)
            .await
            .map_err(lifecycle("remove container"))?;

        match self.routes.retract_route(name).await {
            Ok(()) => {}
            Err(ProvisionError::RouteNotFound(_)) => {
                tracing::debug!(container = %name, "no route to retract");
            }
            Err(e) => return Err(provision("retract route")(e)),
        }

        self.coordinator
            .logs()
            .retract(name)
            .await
            .map_err(provision("remove log directory"))?;

        tracing::info!(container = %name, "container decommissioned");
        Ok(())
    }

    async fn start_routed(
        &self,
        id: &ContainerId,
        name: &ContainerName,
    ) -> Result<TransitionResult, NodeError> {
        let result = self
            .coordinator
            .start_container(&*self.runtime, id)
            .await
            .map_err(lifecycle("start"))?;
        self.route(id, name).await?;
        Ok(result)
    }

    async fn route(&self, id: &ContainerId, name: &ContainerName) -> Result<PathBuf, NodeError> {
        let ip = self.container_ip(id).await?;
        let target: IpAddr = parse_ip(&ip).ok_or_else(|| NodeError::NoAddress(id.to_string()))?;
        let spec = self
            .routes
            .default_route(name.clone(), target)
            .map_err(provision("build route"))?;
        self.routes
            .provision_route(&spec)
            .await
            .map_err(provision("provision route"))
    }

    async fn routable_name(&self, id: &ContainerId) -> Result<ContainerName, NodeError> {
        let name = self.container_name(id).await?;
        ContainerName::new(&name).map_err(|_| NodeError::UnroutableName(name))
    }

    // =========================================================================
    // Images and networks
    // =========================================================================

    pub async fn list_images(&self) -> Result<Vec<ImageSummary>, NodeError> {
        Ok(self.runtime.list_images().await?)
    }

    /// Force-remove an image. A missing image is not an error.
    pub async fn remove_image(&self, reference: &str) -> Result<(), NodeError> {
        match self.runtime.remove_image(reference, true).await {
            Ok(()) => Ok(()),
            Err(ImageError::NotFound(_)) => {
                tracing::debug!(image = reference, "image already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_networks(&self) -> Result<Vec<NetworkSummary>, NodeError> {
        Ok(self.runtime.list_networks().await?)
    }

    pub async fn create_network(
        &self,
        name: &str,
        subnet: &str,
        gateway: &str,
    ) -> Result<NetworkId, NodeError> {
        let config = NetworkConfig {
            name: name.to_string(),
            driver: Some("bridge".to_string()),
            subnet: Some(subnet.to_string()),
            gateway: Some(gateway.to_string()),
            internal: false,
        };
        let id = self.runtime.create_network(&config).await?;
        tracing::info!(network = name, subnet, "network created");
        Ok(id)
    }

    pub async fn remove_network(&self, name: &str) -> Result<(), NodeError> {
        self.runtime.remove_network(name).await?;
        tracing::info!(network = name, "network removed");
        Ok(())
    }

    /// Connect a container to a network and return its address there.
    pub async fn attach_container(&self, id: &ContainerId, network: &str) -> Result<String, NodeError> {
        self.runtime.connect_to_network(id, network).await?;

        let info = self
            .runtime
            .inspect_container(id)
            .await
            .map_err(|e| lifecycle("inspect")(LifecycleError::runtime("inspect", id, e)))?;
        let ip = info
            .network_settings
            .as_ref()
            .and_then(|s| s.networks.get(network))
            .map(|n| n.ip_address.clone())
            .unwrap_or_default();
        tracing::info!(container = %id, network, %ip, "container attached");
        Ok(ip)
    }

    // =========================================================================
    // Guest and status
    // =========================================================================

    pub async fn exec(&self, id: &ContainerId, command: &[String]) -> Result<ExecResult, NodeError> {
        Ok(guest::exec(&*self.runtime, id, command).await?)
    }

    pub async fn list_services(&self, id: &ContainerId) -> Result<Vec<ManagedService>, NodeError> {
        Ok(self.services.list_services(&*self.runtime, id).await?)
    }

    pub async fn start_service(
        &self,
        id: &ContainerId,
        unit: &UnitName,
    ) -> Result<ManagedService, NodeError> {
        Ok(self.services.start_service(&*self.runtime, id, unit).await?)
    }

    pub async fn stop_service(
        &self,
        id: &ContainerId,
        unit: &UnitName,
    ) -> Result<ManagedService, NodeError> {
        Ok(self.services.stop_service(&*self.runtime, id, unit).await?)
    }

    pub async fn status<H>(&self, probe: &H) -> Result<NodeStatus, NodeError>
    where
        H: HostProbe + ?Sized,
    {
        Ok(status::node_status(&self.coordinator, &*self.runtime, probe, &self.status).await?)
    }
}
