// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerConfig, ContainerInfo, stats, exec, network and image projections.

use crate::types::{ContainerId, ImageId, NetworkId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;

/// Configuration for creating a container.
#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    pub name: String,
    pub image: String,
    pub mounts: Vec<MountSpec>,
    pub resources: Option<ResourceLimits>,
    /// Network to attach on creation (required when `static_ip` is set).
    pub network: Option<String>,
    pub static_ip: Option<IpAddr>,
    pub privileged: bool,
    pub cap_add: Vec<String>,
    pub tty: bool,
}

/// A filesystem mount for a new container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSpec {
    Bind {
        source: String,
        target: String,
        read_only: bool,
    },
    Tmpfs {
        target: String,
        options: Vec<String>,
    },
}

/// Resource limits for a container.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceLimits {
    /// Memory limit in bytes.
    pub memory: Option<i64>,
    /// CPU quota (1.0 = 1 CPU).
    pub cpus: Option<f64>,
}

/// Detailed information about one container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i64>,
    /// `None` when the runtime reports no network settings at all.
    pub network_settings: Option<NetworkSettings>,
}

impl ContainerInfo {
    /// First non-empty address across attached networks, in network-name order.
    pub fn ip_address(&self) -> Option<&str> {
        let settings = self.network_settings.as_ref()?;
        let mut names: Vec<&String> = settings.networks.keys().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|n| settings.networks.get(n))
            .map(|n| n.ip_address.as_str())
            .find(|ip| !ip.is_empty())
    }
}

/// Container state as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Stopping,
    Exited,
    Dead,
    Unknown,
}

impl ContainerState {
    /// Parse a runtime status string. Podman's `stopped` is an exited container.
    pub fn from_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "created" | "configured" | "initialized" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "removing" => Self::Removing,
            "stopping" => Self::Stopping,
            "exited" | "stopped" => Self::Exited,
            "dead" => Self::Dead,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Stopping => "stopping",
            Self::Exited => "exited",
            Self::Dead => "dead",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether there is a process left for a stop request to act on.
    pub fn is_stoppable(&self) -> bool {
        matches!(
            self,
            Self::Running | Self::Paused | Self::Restarting | Self::Stopping
        )
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network settings for a container.
#[derive(Debug, Clone, Default)]
pub struct NetworkSettings {
    pub networks: HashMap<String, NetworkInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkInfo {
    pub ip_address: String,
}

/// Condition a container can be waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    Running,
    Stopped,
}

impl std::fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitCondition::Running => f.write_str("running"),
            WaitCondition::Stopped => f.write_str("stopped"),
        }
    }
}

/// One-shot resource usage sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerStats {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Options for removing a container.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    pub force: bool,
    /// Seconds the runtime may spend stopping the container first.
    pub timeout: Option<std::time::Duration>,
}

/// Per-container outcome of a remove call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveReport {
    pub id: String,
    pub error: Option<String>,
}

/// Exec configuration for running commands in containers.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    pub cmd: Vec<String>,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    pub tty: bool,
}

impl ExecConfig {
    pub fn command<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            cmd: Vec::new(),
            attach_stdout: true,
            attach_stderr: true,
            tty: false,
        }
    }
}

/// Raw output captured from an exec session.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Exec instance information.
#[derive(Debug, Clone)]
pub struct ExecInfo {
    pub id: String,
    pub running: bool,
    pub exit_code: Option<i64>,
}

/// Configuration for creating a network.
#[derive(Debug, Clone, Default)]
pub struct NetworkConfig {
    pub name: String,
    pub driver: Option<String>,
    pub subnet: Option<String>,
    pub gateway: Option<String>,
    pub internal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSummary {
    pub id: NetworkId,
    pub name: String,
    pub driver: String,
    pub internal: bool,
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageSummary {
    pub id: ImageId,
    pub tags: Vec<String>,
    pub size: i64,
    pub created: i64,
    pub containers: i64,
}
