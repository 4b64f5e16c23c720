// ABOUTME: Container lifecycle coordinator.
// ABOUTME: Start, stop, create and remove as multi-step protocols with confirmed end states.

use std::net::IpAddr;

use crate::config::LifecycleConfig;
use crate::provision::LogLayout;
use crate::runtime::{
    ContainerConfig, ContainerError, ContainerInfo, ContainerOps, ContainerState, RemoveOptions,
    ResourceLimits, WaitCondition,
};
use crate::types::{ContainerId, ContainerName};

use super::error::LifecycleError;
use super::listing::collect_records;
use super::locks::LockTable;
use super::probe::{
    DEFAULT_PROBE_IMAGE, PROBE_CAPABILITIES, kernel_release, probe_mounts, random_job_name,
};
use super::record::{ContainerRecord, CreateOptions, TransitionResult};

/// Drives containers through their lifecycle on one node.
///
/// Transitions on the same container ID are serialized within this process.
/// Every transition returns only after the runtime confirms the target state.
pub struct Coordinator {
    config: LifecycleConfig,
    logs: LogLayout,
    locks: LockTable,
}

impl Coordinator {
    pub fn new(config: LifecycleConfig, logs: LogLayout) -> Self {
        Self {
            config,
            logs,
            locks: LockTable::default(),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn logs(&self) -> &LogLayout {
        &self.logs
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    pub async fn list_containers<R>(&self, runtime: &R) -> Result<Vec<ContainerRecord>, LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        collect_records(runtime).await
    }

    pub async fn inspect_name<R>(&self, runtime: &R, id: &ContainerId) -> Result<String, LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        Ok(inspect(runtime, id).await?.name)
    }

    /// Address on the first attached network, empty if none has one.
    ///
    /// # Errors
    ///
    /// `NoNetworkSettings` if the runtime reports no network settings at all.
    pub async fn inspect_ip<R>(&self, runtime: &R, id: &ContainerId) -> Result<String, LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        let info = inspect(runtime, id).await?;
        if info.network_settings.is_none() {
            return Err(LifecycleError::NoNetworkSettings(id.to_string()));
        }
        Ok(info.ip_address().unwrap_or_default().to_string())
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Start a container and wait until it is running.
    ///
    /// # Errors
    ///
    /// `AlreadyInState` if it is already running, `TransitionTimeout` if the
    /// runtime accepted the start but the container never reported running.
    pub async fn start_container<R>(
        &self,
        runtime: &R,
        id: &ContainerId,
    ) -> Result<TransitionResult, LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        let _guard = self.locks.acquire(id.as_str()).await;

        let info = inspect(runtime, id).await?;
        if info.state.is_running() {
            return Err(LifecycleError::AlreadyInState {
                id: id.to_string(),
                state: info.state,
            });
        }

        tracing::debug!(container = %id, from = %info.state, "starting container");
        runtime
            .start_container(id)
            .await
            .map_err(|e| match e {
                ContainerError::AlreadyRunning(_) => LifecycleError::AlreadyInState {
                    id: id.to_string(),
                    state: ContainerState::Running,
                },
                e => LifecycleError::runtime("start", id, e),
            })?;

        self.await_condition(runtime, id, WaitCondition::Running)
            .await?;

        let state = inspect(runtime, id).await?.state;
        tracing::info!(container = %id, %state, "container started");
        Ok(TransitionResult {
            id: id.clone(),
            state,
        })
    }

    /// Stop a container and wait until it has exited.
    ///
    /// # Errors
    ///
    /// `AlreadyInState` if there is no process to stop, `TransitionTimeout`
    /// if the container was not confirmed stopped in time.
    pub async fn stop_container<R>(
        &self,
        runtime: &R,
        id: &ContainerId,
    ) -> Result<TransitionResult, LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        let _guard = self.locks.acquire(id.as_str()).await;
        let info = inspect(runtime, id).await?;
        self.stop_locked(runtime, id, info.state).await
    }

    async fn stop_locked<R>(
        &self,
        runtime: &R,
        id: &ContainerId,
        current: ContainerState,
    ) -> Result<TransitionResult, LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        if !current.is_stoppable() {
            return Err(LifecycleError::AlreadyInState {
                id: id.to_string(),
                state: current,
            });
        }

        tracing::debug!(container = %id, from = %current, "stopping container");
        runtime
            .stop_container(id, self.config.stop_grace)
            .await
            .map_err(|e| match e {
                ContainerError::NotRunning(_) => LifecycleError::AlreadyInState {
                    id: id.to_string(),
                    state: ContainerState::Exited,
                },
                e => LifecycleError::runtime("stop", id, e),
            })?;

        self.await_condition(runtime, id, WaitCondition::Stopped)
            .await?;

        let state = inspect(runtime, id).await?.state;
        tracing::info!(container = %id, %state, "container stopped");
        Ok(TransitionResult {
            id: id.clone(),
            state,
        })
    }

    /// Remove a container, stopping it first if it is running.
    ///
    /// Routes and log directories are left in place.
    ///
    /// # Errors
    ///
    /// Any stop failure, or `RemoveFailed` carrying every error the runtime
    /// reported for the removal.
    pub async fn remove_container<R>(&self, runtime: &R, id: &ContainerId) -> Result<(), LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        let _guard = self.locks.acquire(id.as_str()).await;

        let info = inspect(runtime, id).await?;
        if info.state.is_stoppable() {
            match self.stop_locked(runtime, id, info.state).await {
                Ok(_) => {}
                Err(LifecycleError::AlreadyInState { state, .. }) => {
                    tracing::debug!(container = %id, %state, "container stopped on its own before removal");
                }
                Err(e) => return Err(e),
            }
        }

        let opts = RemoveOptions {
            force: true,
            timeout: Some(self.config.remove_timeout),
        };
        let reports = runtime
            .remove_container(id, &opts)
            .await
            .map_err(|e| LifecycleError::runtime("remove", id, e))?;

        let failures: Vec<String> = reports
            .into_iter()
            .filter_map(|r| r.error.map(|e| format!("{}: {}", r.id, e)))
            .collect();
        if !failures.is_empty() {
            return Err(LifecycleError::RemoveFailed {
                id: id.to_string(),
                message: failures.join("; "),
            });
        }

        tracing::info!(container = %id, "container removed");
        Ok(())
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create (but do not start) a container with its log directory mounted.
    ///
    /// # Errors
    ///
    /// `NameConflict` if the name is taken; nothing is created in that case.
    pub async fn create_container<R>(
        &self,
        runtime: &R,
        image: &str,
        name: &ContainerName,
        options: &CreateOptions,
    ) -> Result<ContainerId, LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        self.ensure_name_free(runtime, name).await?;
        self.logs.provision(name).await?;

        let config = ContainerConfig {
            mounts: vec![self.logs.mount(name)],
            ..self.base_config(image, name, options)
        };

        self.create(runtime, name, &config).await
    }

    /// Create a privileged eBPF probe container.
    ///
    /// The image defaults to `base_ebpf:latest` and the name to a random job id.
    pub async fn create_probe_container<R>(
        &self,
        runtime: &R,
        image: Option<&str>,
        name: Option<ContainerName>,
        options: &CreateOptions,
    ) -> Result<ContainerId, LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        let release = kernel_release()
            .await
            .map_err(LifecycleError::KernelRelease)?;
        let name = match name {
            Some(name) => name,
            None => random_job_name()?,
        };
        let image = image.filter(|i| !i.is_empty()).unwrap_or(DEFAULT_PROBE_IMAGE);

        self.ensure_name_free(runtime, &name).await?;
        self.logs.provision(&name).await?;

        let config = self.probe_config(image, &name, &release, options);
        self.create(runtime, &name, &config).await
    }

    pub(crate) fn probe_config(
        &self,
        image: &str,
        name: &ContainerName,
        release: &str,
        options: &CreateOptions,
    ) -> ContainerConfig {
        let mut mounts = probe_mounts(release);
        mounts.push(self.logs.mount(name));

        ContainerConfig {
            mounts,
            privileged: true,
            cap_add: PROBE_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            tty: false,
            ..self.base_config(image, name, options)
        }
    }

    fn base_config(&self, image: &str, name: &ContainerName, options: &CreateOptions) -> ContainerConfig {
        let resources = (options.cpus.is_some() || options.memory.is_some()).then_some(
            ResourceLimits {
                memory: options.memory,
                cpus: options.cpus,
            },
        );

        ContainerConfig {
            name: name.to_string(),
            image: image.to_string(),
            resources,
            network: options
                .static_ip
                .map(|_| self.config.default_network.clone()),
            static_ip: options.static_ip,
            ..Default::default()
        }
    }

    async fn create<R>(
        &self,
        runtime: &R,
        name: &ContainerName,
        config: &ContainerConfig,
    ) -> Result<ContainerId, LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        tracing::debug!(container = %name, image = %config.image, "creating container");
        let id = runtime.create_container(config).await.map_err(|e| match e {
            ContainerError::AlreadyExists(_) => LifecycleError::NameConflict(name.to_string()),
            e => LifecycleError::runtime("create", name, e),
        })?;
        tracing::info!(container = %name, id = %id.short(), "container created");
        Ok(id)
    }

    async fn ensure_name_free<R>(&self, runtime: &R, name: &ContainerName) -> Result<(), LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        match runtime
            .inspect_container(&ContainerId::new(name.as_str()))
            .await
        {
            Ok(_) => Err(LifecycleError::NameConflict(name.to_string())),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(LifecycleError::runtime("inspect", name, e)),
        }
    }

    /// Wait for `condition`, dropping the wait if the deadline passes first.
    async fn await_condition<R>(
        &self,
        runtime: &R,
        id: &ContainerId,
        condition: WaitCondition,
    ) -> Result<(), LifecycleError>
    where
        R: ContainerOps + ?Sized,
    {
        let timeout = self.config.transition_timeout;
        match tokio::time::timeout(timeout, runtime.wait_container(id, condition)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LifecycleError::runtime("wait for", id, e)),
            Err(_) => {
                tracing::warn!(container = %id, %condition, ?timeout, "transition not confirmed in time");
                Err(LifecycleError::TransitionTimeout {
                    id: id.to_string(),
                    condition,
                    timeout,
                })
            }
        }
    }
}

async fn inspect<R>(runtime: &R, id: &ContainerId) -> Result<ContainerInfo, LifecycleError>
where
    R: ContainerOps + ?Sized,
{
    runtime
        .inspect_container(id)
        .await
        .map_err(|e| LifecycleError::runtime("inspect", id, e))
}

/// Parse an address reported by the runtime. Empty means unattached.
pub(crate) fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.parse().ok()
}
