// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Serves Podman and Docker via the compatible API, with libpod calls where needed.

use crate::runtime::error::{ClientSnafu, RuntimeError, UnreachableSnafu};
use crate::runtime::traits::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps, ContainerState,
    ContainerStats, ContainerSummary, ExecConfig, ExecError, ExecInfo, ExecOps, ExecOutput,
    ImageError, ImageOps, ImageSummary, MountSpec, NetworkConfig, NetworkError, NetworkInfo,
    NetworkOps, NetworkSettings, NetworkSummary, RemoveOptions, RemoveReport, RuntimeInfo,
    RuntimeInfoError, WaitCondition,
};
use crate::runtime::types::{RuntimeEndpoint, RuntimeType};
use crate::types::{ContainerId, ImageId, NetworkId};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::exec::{StartExecOptions, StartExecResults};
use bollard::models::{
    ContainerCreateBody, EndpointIpamConfig, EndpointSettings, HostConfig, Ipam, IpamConfig,
    Mount, MountTypeEnum, NetworkConnectRequest, NetworkCreateRequest, NetworkingConfig,
};
use bollard::query_parameters::{
    CreateContainerOptions, InspectContainerOptions, ListContainersOptions, ListImagesOptions,
    ListNetworksOptions, RemoveContainerOptions, RemoveImageOptions, StatsOptions,
    StopContainerOptions, WaitContainerOptions,
};
use chrono::{DateTime, Datelike, Utc};
use futures::StreamExt;
use http_body_util::BodyExt;
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use snafu::ResultExt;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::net::UnixStream;

const LIBPOD_PREFIX: &str = "/v4.0.0/libpod";
const STATE_POLL_INTERVAL: Duration = Duration::from_millis(100);
const EXEC_POLL_INTERVAL: Duration = Duration::from_millis(100);
const EXEC_DRAIN_GRACE: Duration = Duration::from_millis(200);

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_image_remove_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ImageError::NotFound(image_name.to_string())
        }
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ImageError::InUse(message.clone()),
        _ => ImageError::Runtime(format!("failed to remove {}: {}", image_name, e)),
    }
}

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::ImageNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ContainerError::AlreadyExists(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 400 => ContainerError::InvalidConfig(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::AlreadyRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::NotRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_network_create_error(e: bollard::errors::Error) -> NetworkError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => NetworkError::AlreadyExists(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 400 => NetworkError::InvalidConfig(message.clone()),
        _ => NetworkError::Runtime(e.to_string()),
    }
}

fn map_network_remove_error(e: bollard::errors::Error) -> NetworkError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => NetworkError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 403 || *status_code == 409 => NetworkError::InUse(message.clone()),
        _ => NetworkError::Runtime(e.to_string()),
    }
}

fn map_network_connect_error(e: bollard::errors::Error) -> NetworkError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => NetworkError::NotFound(message.clone()),
        _ => NetworkError::Runtime(e.to_string()),
    }
}

fn map_exec_create_error(e: bollard::errors::Error) -> ExecError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ExecError::ContainerNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ExecError::ContainerNotRunning(message.clone()),
        _ => ExecError::Runtime(e.to_string()),
    }
}

fn map_exec_not_found_error(e: bollard::errors::Error) -> ExecError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ExecError::ExecNotFound(message.clone()),
        _ => ExecError::Runtime(e.to_string()),
    }
}

// =============================================================================
// Conversion Helpers
// =============================================================================

/// Parse a runtime timestamp. Zero values (`0001-01-01T00:00:00Z`) mean unset.
fn parse_runtime_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
        .filter(|t| t.year() > 1)
}

/// Timestamps arrive as RFC 3339 strings or as decoded dates depending on the field.
trait RuntimeTime {
    fn to_utc(&self) -> Option<DateTime<Utc>>;
}

impl RuntimeTime for String {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        parse_runtime_time(self)
    }
}

impl RuntimeTime for DateTime<Utc> {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        Some(*self).filter(|t| t.year() > 1)
    }
}

/// CPU counters from one stats sample.
#[derive(Debug, Clone, Copy, Default)]
struct CpuSample {
    total: u64,
    system: u64,
    online_cpus: u32,
}

/// CPU usage between two samples, scaled by online CPUs (Docker CLI formula).
fn cpu_percent(current: CpuSample, previous: CpuSample) -> f64 {
    let cpu_delta = current.total as f64 - previous.total as f64;
    let system_delta = current.system as f64 - previous.system as f64;
    if cpu_delta <= 0.0 || system_delta <= 0.0 {
        return 0.0;
    }
    let cpus = f64::from(current.online_cpus.max(1));
    cpu_delta / system_delta * cpus * 100.0
}

/// Memory usage excluding reclaimable page cache, as a share of the limit.
fn memory_percent(usage: u64, cache: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    usage.saturating_sub(cache) as f64 / limit as f64 * 100.0
}

fn append_output(
    collected: &mut ExecOutput,
    item: Result<LogOutput, bollard::errors::Error>,
) -> Result<(), ExecError> {
    match item {
        Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
            collected.stdout.extend_from_slice(&message);
        }
        Ok(LogOutput::StdErr { message }) => {
            collected.stderr.extend_from_slice(&message);
        }
        Ok(LogOutput::StdIn { .. }) => {}
        Err(e) => return Err(ExecError::Failed(e.to_string())),
    }
    Ok(())
}

/// One entry of a libpod container-remove response.
#[derive(Debug, Deserialize)]
struct LibpodRemoveReport {
    #[serde(rename = "Id", default)]
    id: String,
    #[serde(rename = "Err", default)]
    err: Option<String>,
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Supports both Docker and Podman via the Docker-compatible API.
/// For Podman, uses the native libpod API where the compatible API has no
/// equivalent (waiting for the running condition, per-container remove reports).
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
    socket_path: String,
}

impl BollardRuntime {
    /// Build a client for the endpoint. Does not touch the socket yet.
    pub fn connect(endpoint: &RuntimeEndpoint) -> Result<Self, RuntimeError> {
        let client =
            Docker::connect_with_unix(&endpoint.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .context(ClientSnafu {
                    socket: &endpoint.socket_path,
                })?;
        Ok(Self {
            client,
            runtime_type: endpoint.runtime_type,
            socket_path: endpoint.socket_path.clone(),
        })
    }

    /// Build a client and confirm the runtime answers a ping.
    pub async fn connect_verified(endpoint: &RuntimeEndpoint) -> Result<Self, RuntimeError> {
        let runtime = Self::connect(endpoint)?;
        runtime.ping().await.context(UnreachableSnafu {
            socket: &endpoint.socket_path,
        })?;
        Ok(runtime)
    }

    fn libpod_socket(&self) -> Option<&str> {
        match self.runtime_type {
            RuntimeType::Podman => Some(self.socket_path.as_str()),
            RuntimeType::Docker => None,
        }
    }

    /// Send one request to the libpod API over a fresh socket connection.
    async fn libpod_request(
        &self,
        socket_path: &str,
        method: hyper::Method,
        path_and_query: &str,
    ) -> Result<(hyper::StatusCode, bytes::Bytes), String> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|e| format!("failed to connect to socket: {}", e))?;

        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| format!("HTTP handshake failed: {}", e))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("libpod connection error: {}", e);
            }
        });

        let uri = format!("{}{}", LIBPOD_PREFIX, path_and_query);
        let req = hyper::Request::builder()
            .method(method)
            .uri(&uri)
            .header("Host", "localhost")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| format!("failed to build request: {}", e))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| format!("failed to read response: {}", e))?
            .to_bytes();

        Ok((status, body))
    }

    /// Block on libpod's wait endpoint until the container is running.
    async fn wait_running_libpod(
        &self,
        socket_path: &str,
        id: &ContainerId,
    ) -> Result<(), ContainerError> {
        let path = format!(
            "/containers/{}/wait?condition=running",
            urlencoding::encode(id.as_str())
        );
        let (status, body) = self
            .libpod_request(socket_path, hyper::Method::POST, &path)
            .await
            .map_err(ContainerError::Runtime)?;

        match status.as_u16() {
            200..=299 => Ok(()),
            404 => Err(ContainerError::NotFound(id.to_string())),
            _ => Err(ContainerError::Runtime(format!(
                "wait for {} failed: {}",
                id,
                String::from_utf8_lossy(&body)
            ))),
        }
    }

    /// Poll inspect until the container is running.
    async fn wait_running_polling(&self, id: &ContainerId) -> Result<(), ContainerError> {
        loop {
            if self.inspect_container(id).await?.state.is_running() {
                return Ok(());
            }
            tokio::time::sleep(STATE_POLL_INTERVAL).await;
        }
    }

    async fn wait_not_running(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let opts = WaitContainerOptions {
            condition: "not-running".to_string(),
        };
        let mut stream = self.client.wait_container(id.as_str(), Some(opts));
        match stream.next().await {
            // A non-zero exit code still means the container stopped.
            Some(Ok(_))
            | Some(Err(bollard::errors::Error::DockerContainerWaitError { .. }))
            | None => Ok(()),
            Some(Err(e)) => Err(map_container_not_found_error(e)),
        }
    }

    /// Remove through libpod so per-container errors come back as reports.
    async fn remove_container_libpod(
        &self,
        socket_path: &str,
        id: &ContainerId,
        opts: &RemoveOptions,
    ) -> Result<Vec<RemoveReport>, ContainerError> {
        let mut path = format!(
            "/containers/{}?force={}",
            urlencoding::encode(id.as_str()),
            opts.force
        );
        if let Some(timeout) = opts.timeout {
            path.push_str(&format!("&timeout={}", timeout.as_secs()));
        }

        let (status, body) = self
            .libpod_request(socket_path, hyper::Method::DELETE, &path)
            .await
            .map_err(ContainerError::Runtime)?;

        match status.as_u16() {
            200..=299 => {
                if body.is_empty() {
                    return Ok(vec![RemoveReport {
                        id: id.to_string(),
                        error: None,
                    }]);
                }
                let reports: Vec<LibpodRemoveReport> = serde_json::from_slice(&body)
                    .map_err(|e| ContainerError::Runtime(format!("bad remove response: {}", e)))?;
                Ok(reports
                    .into_iter()
                    .map(|r| RemoveReport {
                        id: r.id,
                        error: r.err.filter(|e| !e.is_empty()),
                    })
                    .collect())
            }
            404 => Err(ContainerError::NotFound(id.to_string())),
            _ => Err(ContainerError::Runtime(format!(
                "remove {} failed: {}",
                id,
                String::from_utf8_lossy(&body)
            ))),
        }
    }
}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn list_images(&self) -> Result<Vec<ImageSummary>, ImageError> {
        let images = self
            .client
            .list_images(Some(ListImagesOptions {
                all: false,
                ..Default::default()
            }))
            .await
            .map_err(|e| ImageError::Runtime(e.to_string()))?;

        Ok(images
            .into_iter()
            .map(|img| ImageSummary {
                id: ImageId::new(img.id),
                tags: img.repo_tags,
                size: img.size,
                created: img.created,
                containers: img.containers,
            })
            .collect())
    }

    async fn remove_image(&self, reference: &str, force: bool) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_image(reference, Some(opts), None)
            .await
            .map_err(|e| map_image_remove_error(e, reference))?;

        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        if config.static_ip.is_some() && config.network.is_none() {
            return Err(ContainerError::InvalidConfig(
                "a static IP requires a network".to_string(),
            ));
        }

        let mut host_config = HostConfig {
            privileged: Some(config.privileged),
            ..Default::default()
        };

        if let Some(ref resources) = config.resources {
            if let Some(memory) = resources.memory {
                host_config.memory = Some(memory);
            }
            if let Some(cpus) = resources.cpus {
                host_config.nano_cpus = Some((cpus * 1_000_000_000.0) as i64);
            }
        }

        if !config.cap_add.is_empty() {
            host_config.cap_add = Some(config.cap_add.clone());
        }

        let mut mounts: Vec<Mount> = Vec::new();
        let mut tmpfs: HashMap<String, String> = HashMap::new();
        for mount in &config.mounts {
            match mount {
                MountSpec::Bind {
                    source,
                    target,
                    read_only,
                } => mounts.push(Mount {
                    source: Some(source.clone()),
                    target: Some(target.clone()),
                    typ: Some(MountTypeEnum::BIND),
                    read_only: Some(*read_only),
                    ..Default::default()
                }),
                MountSpec::Tmpfs { target, options } => {
                    tmpfs.insert(target.clone(), options.join(","));
                }
            }
        }
        if !mounts.is_empty() {
            host_config.mounts = Some(mounts);
        }
        if !tmpfs.is_empty() {
            host_config.tmpfs = Some(tmpfs);
        }

        if let Some(ref network) = config.network {
            host_config.network_mode = Some(network.clone());
        }

        let networking_config = config.network.as_ref().map(|network| {
            let ipam_config = config.static_ip.map(|ip| match ip {
                IpAddr::V4(v4) => EndpointIpamConfig {
                    ipv4_address: Some(v4.to_string()),
                    ..Default::default()
                },
                IpAddr::V6(v6) => EndpointIpamConfig {
                    ipv6_address: Some(v6.to_string()),
                    ..Default::default()
                },
            });
            let mut endpoints: HashMap<String, EndpointSettings> = HashMap::new();
            endpoints.insert(
                network.clone(),
                EndpointSettings {
                    ipam_config,
                    ..Default::default()
                },
            );
            NetworkingConfig {
                endpoints_config: Some(endpoints),
            }
        });

        let container_config = ContainerCreateBody {
            image: Some(config.image.clone()),
            tty: Some(config.tty),
            host_config: Some(host_config),
            networking_config,
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: Some(config.name.clone()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), container_config)
            .await
            .map_err(map_container_create_error)?;

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(
                id.as_str(),
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
            .map_err(map_container_start_error)
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_stop_error)
    }

    async fn remove_container(
        &self,
        id: &ContainerId,
        opts: &RemoveOptions,
    ) -> Result<Vec<RemoveReport>, ContainerError> {
        if let Some(socket) = self.libpod_socket() {
            return self.remove_container_libpod(socket, id, opts).await;
        }

        let remove_opts = RemoveContainerOptions {
            force: opts.force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(remove_opts))
            .await
            .map_err(map_container_not_found_error)?;

        Ok(vec![RemoveReport {
            id: id.to_string(),
            error: None,
        }])
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let state = details
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(|s| match s {
                bollard::models::ContainerStateStatusEnum::CREATED => ContainerState::Created,
                bollard::models::ContainerStateStatusEnum::RUNNING => ContainerState::Running,
                bollard::models::ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
                bollard::models::ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
                bollard::models::ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
                bollard::models::ContainerStateStatusEnum::EXITED => ContainerState::Exited,
                bollard::models::ContainerStateStatusEnum::DEAD => ContainerState::Dead,
                _ => ContainerState::Unknown,
            })
            .unwrap_or(ContainerState::Unknown);

        let started_at = details
            .state
            .as_ref()
            .and_then(|s| s.started_at.as_ref())
            .and_then(RuntimeTime::to_utc);
        let finished_at = details
            .state
            .as_ref()
            .and_then(|s| s.finished_at.as_ref())
            .and_then(RuntimeTime::to_utc);
        let exit_code = details.state.as_ref().and_then(|s| s.exit_code);

        let network_settings = details.network_settings.as_ref().map(|settings| {
            let networks = settings
                .networks
                .as_ref()
                .map(|nets| {
                    nets.iter()
                        .map(|(name, endpoint)| {
                            (
                                name.clone(),
                                NetworkInfo {
                                    ip_address: endpoint.ip_address.clone().unwrap_or_default(),
                                },
                            )
                        })
                        .collect()
                })
                .unwrap_or_default();
            NetworkSettings { networks }
        });

        Ok(ContainerInfo {
            id: ContainerId::new(details.id.clone().unwrap_or_else(|| id.to_string())),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: details
                .config
                .as_ref()
                .and_then(|c| c.image.clone())
                .unwrap_or_default(),
            state,
            started_at,
            finished_at,
            exit_code,
            network_settings,
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let opts = ListContainersOptions {
            all: filters.all,
            ..Default::default()
        };

        // Podman reports transient "stopping"/"stopped" states that bollard
        // cannot deserialize. Retry after a short delay.
        let mut last_error = None;
        for attempt in 0..3 {
            match self.client.list_containers(Some(opts.clone())).await {
                Ok(containers) => {
                    return Ok(containers
                        .into_iter()
                        .map(|c| {
                            let mut ports: Vec<u16> = c
                                .ports
                                .unwrap_or_default()
                                .into_iter()
                                .map(|p| p.private_port)
                                .collect();
                            ports.sort_unstable();
                            ports.dedup();

                            let mut networks: Vec<String> = c
                                .network_settings
                                .and_then(|n| n.networks)
                                .map(|n| n.into_keys().collect())
                                .unwrap_or_default();
                            networks.sort();

                            ContainerSummary {
                                id: ContainerId::new(c.id.unwrap_or_default()),
                                names: c.names.unwrap_or_default(),
                                image: c.image.unwrap_or_default(),
                                state: c
                                    .state
                                    .map(|s| ContainerState::from_status(&s.to_string()))
                                    .unwrap_or(ContainerState::Unknown),
                                status: c.status.unwrap_or_default(),
                                ports,
                                networks,
                            }
                        })
                        .collect());
                }
                Err(e) => {
                    let err_str = e.to_string();
                    if (err_str.contains("unknown variant `stopping`")
                        || err_str.contains("unknown variant `stopped`"))
                        && attempt < 2
                    {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        last_error = Some(err_str);
                        continue;
                    }
                    return Err(ContainerError::Runtime(err_str));
                }
            }
        }

        Err(ContainerError::Runtime(
            last_error.unwrap_or_else(|| "list_containers failed".to_string()),
        ))
    }

    async fn container_stats(&self, id: &ContainerId) -> Result<ContainerStats, ContainerError> {
        let opts = StatsOptions {
            stream: false,
            one_shot: false,
        };

        let mut stream = self.client.stats(id.as_str(), Some(opts));
        let sample = match stream.next().await {
            Some(result) => result.map_err(map_container_not_found_error)?,
            None => {
                return Err(ContainerError::Runtime(format!(
                    "no stats returned for {}",
                    id
                )));
            }
        };

        let cpu_sample = |stats: Option<&bollard::models::ContainerCpuStats>| CpuSample {
            total: stats
                .and_then(|s| s.cpu_usage.as_ref())
                .and_then(|u| u.total_usage)
                .unwrap_or(0),
            system: stats.and_then(|s| s.system_cpu_usage).unwrap_or(0),
            online_cpus: stats
                .and_then(|s| {
                    s.online_cpus.or_else(|| {
                        s.cpu_usage
                            .as_ref()
                            .and_then(|u| u.percpu_usage.as_ref())
                            .map(|p| p.len() as u32)
                    })
                })
                .unwrap_or(1),
        };

        let cpu = cpu_percent(
            cpu_sample(sample.cpu_stats.as_ref()),
            cpu_sample(sample.precpu_stats.as_ref()),
        );

        let memory = sample
            .memory_stats
            .as_ref()
            .map(|m| {
                // cgroup v2 reports inactive_file, v1 reports cache.
                let cache = m
                    .stats
                    .as_ref()
                    .and_then(|s| s.get("inactive_file").or_else(|| s.get("cache")).copied())
                    .unwrap_or(0);
                memory_percent(m.usage.unwrap_or(0), cache, m.limit.unwrap_or(0))
            })
            .unwrap_or(0.0);

        Ok(ContainerStats {
            cpu_percent: cpu,
            memory_percent: memory,
        })
    }

    async fn wait_container(
        &self,
        id: &ContainerId,
        condition: WaitCondition,
    ) -> Result<(), ContainerError> {
        match condition {
            WaitCondition::Stopped => self.wait_not_running(id).await,
            WaitCondition::Running => match self.libpod_socket() {
                Some(socket) => self.wait_running_libpod(socket, id).await,
                None => self.wait_running_polling(id).await,
            },
        }
    }
}

#[async_trait]
impl NetworkOps for BollardRuntime {
    async fn create_network(&self, config: &NetworkConfig) -> Result<NetworkId, NetworkError> {
        let ipam = match (&config.subnet, &config.gateway) {
            (None, None) => None,
            (subnet, gateway) => Some(Ipam {
                config: Some(vec![IpamConfig {
                    subnet: subnet.clone(),
                    gateway: gateway.clone(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        };

        let request = NetworkCreateRequest {
            name: config.name.clone(),
            driver: config.driver.clone(),
            internal: Some(config.internal),
            ipam,
            ..Default::default()
        };

        let response = self
            .client
            .create_network(request)
            .await
            .map_err(map_network_create_error)?;

        Ok(NetworkId::new(response.id))
    }

    async fn remove_network(&self, network: &str) -> Result<(), NetworkError> {
        self.client
            .remove_network(network)
            .await
            .map_err(map_network_remove_error)
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, NetworkError> {
        let networks = self
            .client
            .list_networks(None::<ListNetworksOptions>)
            .await
            .map_err(|e| NetworkError::Runtime(e.to_string()))?;

        Ok(networks
            .into_iter()
            .map(|n| NetworkSummary {
                id: NetworkId::new(n.id.unwrap_or_default()),
                name: n.name.unwrap_or_default(),
                driver: n.driver.unwrap_or_default(),
                internal: n.internal.unwrap_or(false),
                subnets: n
                    .ipam
                    .and_then(|ipam| ipam.config)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|c| c.subnet)
                    .collect(),
            })
            .collect())
    }

    async fn connect_to_network(
        &self,
        container: &ContainerId,
        network: &str,
    ) -> Result<(), NetworkError> {
        let request = NetworkConnectRequest {
            container: container.to_string(),
            endpoint_config: None,
        };

        self.client
            .connect_network(network, request)
            .await
            .map_err(map_network_connect_error)
    }
}

#[async_trait]
impl ExecOps for BollardRuntime {
    async fn exec_create(
        &self,
        container: &ContainerId,
        config: &ExecConfig,
    ) -> Result<String, ExecError> {
        let opts = bollard::models::ExecConfig {
            cmd: Some(config.cmd.clone()),
            attach_stdin: Some(false),
            attach_stdout: Some(config.attach_stdout),
            attach_stderr: Some(config.attach_stderr),
            tty: Some(config.tty),
            ..Default::default()
        };

        let response = self
            .client
            .create_exec(container.as_str(), opts)
            .await
            .map_err(map_exec_create_error)?;

        Ok(response.id)
    }

    async fn exec_start(&self, exec_id: &str) -> Result<ExecOutput, ExecError> {
        let opts = StartExecOptions {
            detach: false,
            ..Default::default()
        };

        let result = self
            .client
            .start_exec(exec_id, Some(opts))
            .await
            .map_err(map_exec_not_found_error)?;

        let StartExecResults::Attached { mut output, .. } = result else {
            return Ok(ExecOutput::default());
        };

        let mut collected = ExecOutput::default();

        if self.runtime_type != RuntimeType::Podman {
            while let Some(item) = output.next().await {
                append_output(&mut collected, item)?;
            }
            return Ok(collected);
        }

        // Podman can keep the attach stream open after the process exits, so
        // watch the session and stop reading shortly after it finishes.
        let mut poll = tokio::time::interval(EXEC_POLL_INTERVAL);
        let mut finished_at: Option<Instant> = None;
        loop {
            tokio::select! {
                item = output.next() => match item {
                    Some(item) => append_output(&mut collected, item)?,
                    None => break,
                },
                _ = poll.tick() => {
                    match finished_at {
                        Some(at) if at.elapsed() >= EXEC_DRAIN_GRACE => break,
                        Some(_) => {}
                        None => {
                            if !self.exec_inspect(exec_id).await?.running {
                                finished_at = Some(Instant::now());
                            }
                        }
                    }
                }
            }
        }

        Ok(collected)
    }

    async fn exec_inspect(&self, exec_id: &str) -> Result<ExecInfo, ExecError> {
        let details = self
            .client
            .inspect_exec(exec_id)
            .await
            .map_err(map_exec_not_found_error)?;

        Ok(ExecInfo {
            id: exec_id.to_string(),
            running: details.running.unwrap_or(false),
            exit_code: details.exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timestamp_is_unset() {
        assert!(parse_runtime_time("0001-01-01T00:00:00Z").is_none());
    }

    #[test]
    fn timestamp_with_nanoseconds_parses() {
        let t = parse_runtime_time("2024-05-01T12:30:00.123456789Z").unwrap();
        assert_eq!(t.timestamp(), 1714566600);
    }

    #[test]
    fn garbage_timestamp_is_unset() {
        assert!(parse_runtime_time("yesterday").is_none());
    }

    #[test]
    fn cpu_percent_scales_by_online_cpus() {
        let previous = CpuSample {
            total: 1_000,
            system: 10_000,
            online_cpus: 4,
        };
        let current = CpuSample {
            total: 1_500,
            system: 20_000,
            online_cpus: 4,
        };
        // 500 / 10_000 * 4 * 100
        assert!((cpu_percent(current, previous) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn cpu_percent_is_zero_without_previous_sample_delta() {
        let sample = CpuSample {
            total: 500,
            system: 1_000,
            online_cpus: 2,
        };
        assert_eq!(cpu_percent(sample, sample), 0.0);
    }

    #[test]
    fn memory_percent_subtracts_cache() {
        assert!((memory_percent(600, 100, 1_000) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn memory_percent_without_limit_is_zero() {
        assert_eq!(memory_percent(600, 0, 0), 0.0);
    }

    #[test]
    fn libpod_remove_report_parses_null_error() {
        let reports: Vec<LibpodRemoveReport> =
            serde_json::from_str(r#"[{"Id":"abc","Err":null}]"#).unwrap();
        assert_eq!(reports[0].id, "abc");
        assert!(reports[0].err.is_none());
    }
}
