// ABOUTME: Scripted in-memory container runtime for integration tests.
// ABOUTME: Records every call and lets tests hang waits, delay starts and script exec replies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nodeapi::runtime::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps,
    ContainerState, ContainerStats, ContainerSummary, ExecConfig, ExecError, ExecInfo, ExecOps,
    ExecOutput, ImageError, ImageOps, ImageSummary, NetworkConfig, NetworkError, NetworkInfo,
    NetworkOps, NetworkSettings, NetworkSummary, RemoveOptions, RemoveReport, RuntimeInfo,
    RuntimeInfoError, WaitCondition,
};
use nodeapi::types::{ContainerId, NetworkId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    /// Network name to address. `None` means the runtime reports no settings.
    pub networks: Option<HashMap<String, String>>,
    pub exit_code: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats: ContainerStats,
    pub stats_fail: bool,
    pub inspect_fail: bool,
    /// Exits on its own just as a stop request arrives.
    pub exits_before_stop: bool,
}

impl FakeContainer {
    pub fn new(id: &str, name: &str, state: ContainerState) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            image: "alpine:latest".to_string(),
            state,
            networks: Some(HashMap::from([("podman".to_string(), String::new())])),
            exit_code: None,
            started_at: state.is_running().then(Utc::now),
            finished_at: None,
            stats: ContainerStats::default(),
            stats_fail: false,
            inspect_fail: false,
            exits_before_stop: false,
        }
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.networks = Some(HashMap::from([("podman".to_string(), ip.to_string())]));
        self
    }

    pub fn without_network_settings(mut self) -> Self {
        self.networks = None;
        self
    }

    pub fn with_stats(mut self, cpu_percent: f64, memory_percent: f64) -> Self {
        self.stats = ContainerStats {
            cpu_percent,
            memory_percent,
        };
        self
    }

    pub fn exited_with(mut self, code: i64, at: DateTime<Utc>) -> Self {
        self.state = ContainerState::Exited;
        self.exit_code = Some(code);
        self.finished_at = Some(at);
        self
    }

    pub fn failing_stats(mut self) -> Self {
        self.stats_fail = true;
        self
    }

    pub fn failing_inspect(mut self) -> Self {
        self.inspect_fail = true;
        self
    }

    pub fn exiting_before_stop(mut self) -> Self {
        self.exits_before_stop = true;
        self
    }

    fn matches(&self, key: &str) -> bool {
        self.id == key || self.name == key.strip_prefix('/').unwrap_or(key)
    }
}

/// What an exec session prints and how it exits.
#[derive(Debug, Clone, Default)]
pub struct ExecReply {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

impl ExecReply {
    pub fn ok(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            ..Default::default()
        }
    }

    pub fn exit(exit_code: i64, stdout: &str, stderr: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
        }
    }
}

type ExecHandler = Box<dyn Fn(&[String]) -> ExecReply + Send + Sync>;

/// How waits on a container resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Transitions take effect and waits resolve at once.
    Confirm,
    /// The runtime accepts requests but the container never gets there.
    Hang,
}

pub struct FakeRuntime {
    containers: Mutex<Vec<FakeContainer>>,
    images: Mutex<Vec<ImageSummary>>,
    networks: Mutex<Vec<NetworkSummary>>,
    created: Mutex<Vec<ContainerConfig>>,
    calls: Mutex<Vec<String>>,
    remove_reports: Mutex<Option<Vec<RemoveReport>>>,
    exec_handler: ExecHandler,
    exec_commands: Mutex<Vec<Vec<String>>>,
    execs: Mutex<HashMap<String, (Vec<String>, Option<i64>)>>,
    wait_mode: Mutex<WaitMode>,
    start_delay: Duration,
    wait_delay: Duration,
    list_delay: Duration,
    next_id: AtomicUsize,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            containers: Mutex::new(Vec::new()),
            images: Mutex::new(Vec::new()),
            networks: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            remove_reports: Mutex::new(None),
            exec_handler: Box::new(|_| ExecReply::default()),
            exec_commands: Mutex::new(Vec::new()),
            execs: Mutex::new(HashMap::new()),
            wait_mode: Mutex::new(WaitMode::Confirm),
            start_delay: Duration::ZERO,
            wait_delay: Duration::ZERO,
            list_delay: Duration::ZERO,
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn with_container(self, container: FakeContainer) -> Self {
        self.containers.lock().push(container);
        self
    }

    pub fn with_image(self, id: &str, tag: &str) -> Self {
        self.images.lock().push(ImageSummary {
            id: id.into(),
            tags: vec![tag.to_string()],
            size: 1024,
            created: 0,
            containers: 0,
        });
        self
    }

    pub fn with_network(self, name: &str) -> Self {
        self.networks.lock().push(NetworkSummary {
            id: NetworkId::new(format!("net-{}", name)),
            name: name.to_string(),
            driver: "bridge".to_string(),
            internal: false,
            subnets: Vec::new(),
        });
        self
    }

    pub fn with_exec<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[String]) -> ExecReply + Send + Sync + 'static,
    {
        self.exec_handler = Box::new(handler);
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn with_wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = delay;
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    pub fn set_wait_mode(&self, mode: WaitMode) {
        *self.wait_mode.lock() = mode;
    }

    pub fn script_remove_reports(&self, reports: Vec<RemoveReport>) {
        *self.remove_reports.lock() = Some(reports);
    }

    pub fn container(&self, key: &str) -> Option<FakeContainer> {
        self.containers.lock().iter().find(|c| c.matches(key)).cloned()
    }

    pub fn created_configs(&self) -> Vec<ContainerConfig> {
        self.created.lock().clone()
    }

    pub fn exec_commands(&self) -> Vec<Vec<String>> {
        self.exec_commands.lock().clone()
    }

    pub fn images(&self) -> Vec<ImageSummary> {
        self.images.lock().clone()
    }

    /// Calls in the order they arrived, as `"<op> <target>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    fn record(&self, op: &str, target: &str) {
        self.calls.lock().push(format!("{} {}", op, target));
    }

    fn with_found<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut FakeContainer) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        let mut containers = self.containers.lock();
        let container = containers
            .iter_mut()
            .find(|c| c.matches(key))
            .ok_or_else(|| ContainerError::NotFound(key.to_string()))?;
        f(container)
    }

    fn next(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn create_container(&self, config: &ContainerConfig) -> Result<ContainerId, ContainerError> {
        self.record("create", &config.name);
        let n = self.next();
        let id = format!("{:0>64}", format!("{:x}", 0xc0de_0000_usize + n));

        let mut containers = self.containers.lock();
        if containers.iter().any(|c| c.name == config.name) {
            return Err(ContainerError::AlreadyExists(config.name.clone()));
        }

        let network = config.network.clone().unwrap_or_else(|| "podman".to_string());
        let ip = config
            .static_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| format!("10.88.0.{}", 10 + n));
        let mut container = FakeContainer::new(&id, &config.name, ContainerState::Created);
        container.image = config.image.clone();
        container.networks = Some(HashMap::from([(network, ip)]));
        containers.push(container);
        self.created.lock().push(config.clone());

        Ok(ContainerId::new(id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.record("start", id.as_str());
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        let confirm = *self.wait_mode.lock() == WaitMode::Confirm;
        self.with_found(id.as_str(), |c| {
            if c.state.is_running() {
                return Err(ContainerError::AlreadyRunning(c.id.clone()));
            }
            if confirm {
                c.state = ContainerState::Running;
                c.started_at = Some(Utc::now());
                c.exit_code = None;
            }
            Ok(())
        })
    }

    async fn stop_container(&self, id: &ContainerId, _timeout: Duration) -> Result<(), ContainerError> {
        self.record("stop", id.as_str());
        let confirm = *self.wait_mode.lock() == WaitMode::Confirm;
        self.with_found(id.as_str(), |c| {
            if c.exits_before_stop {
                c.state = ContainerState::Exited;
                c.exit_code = Some(0);
            }
            if !c.state.is_stoppable() {
                return Err(ContainerError::NotRunning(c.id.clone()));
            }
            if confirm {
                c.state = ContainerState::Exited;
                c.exit_code = Some(0);
                c.finished_at = Some(Utc::now());
            }
            Ok(())
        })
    }

    async fn remove_container(
        &self,
        id: &ContainerId,
        opts: &RemoveOptions,
    ) -> Result<Vec<RemoveReport>, ContainerError> {
        self.record("remove", id.as_str());
        if let Some(reports) = self.remove_reports.lock().clone() {
            return Ok(reports);
        }

        let mut containers = self.containers.lock();
        let index = containers
            .iter()
            .position(|c| c.matches(id.as_str()))
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if containers[index].state.is_running() && !opts.force {
            return Err(ContainerError::Runtime("container is running".to_string()));
        }
        let removed = containers.remove(index);
        Ok(vec![RemoveReport {
            id: removed.id,
            error: None,
        }])
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        self.record("inspect", id.as_str());
        self.with_found(id.as_str(), |c| {
            if c.inspect_fail {
                return Err(ContainerError::Runtime("inspect exploded".to_string()));
            }
            let network_settings = c.networks.as_ref().map(|networks| NetworkSettings {
                networks: networks
                    .iter()
                    .map(|(name, ip)| {
                        (
                            name.clone(),
                            NetworkInfo {
                                ip_address: ip.clone(),
                            },
                        )
                    })
                    .collect(),
            });
            Ok(ContainerInfo {
                id: ContainerId::new(c.id.clone()),
                name: c.name.clone(),
                image: c.image.clone(),
                state: c.state,
                started_at: c.started_at,
                finished_at: c.finished_at,
                exit_code: c.exit_code,
                network_settings,
            })
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        self.record("list", "");
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        let containers = self.containers.lock();
        Ok(containers
            .iter()
            .filter(|c| filters.all || c.state.is_running())
            .map(|c| {
                let mut networks: Vec<String> = c
                    .networks
                    .as_ref()
                    .map(|n| n.keys().cloned().collect())
                    .unwrap_or_default();
                networks.sort();
                ContainerSummary {
                    id: ContainerId::new(c.id.clone()),
                    names: vec![format!("/{}", c.name)],
                    image: c.image.clone(),
                    state: c.state,
                    status: c.state.to_string(),
                    ports: Vec::new(),
                    networks,
                }
            })
            .collect())
    }

    async fn container_stats(&self, id: &ContainerId) -> Result<ContainerStats, ContainerError> {
        self.record("stats", id.as_str());
        self.with_found(id.as_str(), |c| {
            if c.stats_fail {
                return Err(ContainerError::Runtime("stats stream closed".to_string()));
            }
            Ok(c.stats)
        })
    }

    async fn wait_container(
        &self,
        id: &ContainerId,
        condition: WaitCondition,
    ) -> Result<(), ContainerError> {
        self.record("wait", id.as_str());
        if *self.wait_mode.lock() == WaitMode::Hang {
            std::future::pending::<()>().await;
        }
        if !self.wait_delay.is_zero() {
            tokio::time::sleep(self.wait_delay).await;
        }
        self.with_found(id.as_str(), |c| {
            let reached = match condition {
                WaitCondition::Running => c.state.is_running(),
                WaitCondition::Stopped => !c.state.is_stoppable(),
            };
            if reached {
                Ok(())
            } else {
                Err(ContainerError::Runtime(format!(
                    "{} is {}, not {}",
                    c.id, c.state, condition
                )))
            }
        })
    }
}

#[async_trait]
impl ExecOps for FakeRuntime {
    async fn exec_create(&self, container: &ContainerId, config: &ExecConfig) -> Result<String, ExecError> {
        if self.container(container.as_str()).is_none() {
            return Err(ExecError::ContainerNotFound(container.to_string()));
        }
        let exec_id = format!("exec-{}", self.next());
        self.exec_commands.lock().push(config.cmd.clone());
        self.execs
            .lock()
            .insert(exec_id.clone(), (config.cmd.clone(), None));
        Ok(exec_id)
    }

    async fn exec_start(&self, exec_id: &str) -> Result<ExecOutput, ExecError> {
        let cmd = self
            .execs
            .lock()
            .get(exec_id)
            .map(|(cmd, _)| cmd.clone())
            .ok_or_else(|| ExecError::ExecNotFound(exec_id.to_string()))?;

        let reply = (self.exec_handler)(&cmd);
        if let Some(entry) = self.execs.lock().get_mut(exec_id) {
            entry.1 = Some(reply.exit_code);
        }
        Ok(ExecOutput {
            stdout: reply.stdout.into_bytes(),
            stderr: reply.stderr.into_bytes(),
        })
    }

    async fn exec_inspect(&self, exec_id: &str) -> Result<ExecInfo, ExecError> {
        let execs = self.execs.lock();
        let (_, exit_code) = execs
            .get(exec_id)
            .ok_or_else(|| ExecError::ExecNotFound(exec_id.to_string()))?;
        Ok(ExecInfo {
            id: exec_id.to_string(),
            running: exit_code.is_none(),
            exit_code: *exit_code,
        })
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn list_images(&self) -> Result<Vec<ImageSummary>, ImageError> {
        Ok(self.images.lock().clone())
    }

    async fn remove_image(&self, reference: &str, _force: bool) -> Result<(), ImageError> {
        self.record("remove_image", reference);
        let mut images = self.images.lock();
        let index = images
            .iter()
            .position(|i| i.id.as_str() == reference || i.tags.iter().any(|t| t == reference))
            .ok_or_else(|| ImageError::NotFound(reference.to_string()))?;
        images.remove(index);
        Ok(())
    }
}

#[async_trait]
impl NetworkOps for FakeRuntime {
    async fn create_network(&self, config: &NetworkConfig) -> Result<NetworkId, NetworkError> {
        self.record("create_network", &config.name);
        let mut networks = self.networks.lock();
        if networks.iter().any(|n| n.name == config.name) {
            return Err(NetworkError::AlreadyExists(config.name.clone()));
        }
        let id = NetworkId::new(format!("net-{}", config.name));
        networks.push(NetworkSummary {
            id: id.clone(),
            name: config.name.clone(),
            driver: config.driver.clone().unwrap_or_else(|| "bridge".to_string()),
            internal: config.internal,
            subnets: config.subnet.iter().cloned().collect(),
        });
        Ok(id)
    }

    async fn remove_network(&self, network: &str) -> Result<(), NetworkError> {
        self.record("remove_network", network);
        let mut networks = self.networks.lock();
        let index = networks
            .iter()
            .position(|n| n.name == network || n.id.as_str() == network)
            .ok_or_else(|| NetworkError::NotFound(network.to_string()))?;
        networks.remove(index);
        Ok(())
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, NetworkError> {
        Ok(self.networks.lock().clone())
    }

    async fn connect_to_network(&self, container: &ContainerId, network: &str) -> Result<(), NetworkError> {
        self.record("connect", container.as_str());
        if !self.networks.lock().iter().any(|n| n.name == network) {
            return Err(NetworkError::NotFound(network.to_string()));
        }
        let ip = format!("172.20.0.{}", 10 + self.next());
        let mut containers = self.containers.lock();
        let c = containers
            .iter_mut()
            .find(|c| c.matches(container.as_str()))
            .ok_or_else(|| NetworkError::ContainerNotFound(container.to_string()))?;
        c.networks
            .get_or_insert_with(HashMap::new)
            .insert(network.to_string(), ip);
        Ok(())
    }
}

#[async_trait]
impl RuntimeInfo for FakeRuntime {
    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        Ok(())
    }
}
