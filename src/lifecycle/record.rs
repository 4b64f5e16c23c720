// ABOUTME: Point-in-time views of containers returned by the coordinator.
// ABOUTME: Inventory records, confirmed transition results and create options.

use crate::runtime::ContainerState;
use crate::types::ContainerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// One container as observed by an inventory query. Never cached.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerRecord {
    #[serde(rename = "env_id")]
    pub id: ContainerId,
    pub image: String,
    pub names: Vec<String>,
    pub state: ContainerState,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub started_at: Option<DateTime<Utc>>,
    pub ports: Vec<u16>,
    /// Empty when the container is not attached or the lookup failed.
    pub ip: String,
    pub networks: Vec<String>,
    pub exited: bool,
    pub exit_code: Option<i64>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub exited_at: Option<DateTime<Utc>>,
    pub status: String,
    #[serde(rename = "cpu_percentage")]
    pub cpu_percent: f64,
    pub memory_percent: f64,
    /// Seconds since start; zero unless running.
    pub uptime: u64,
}

/// A state the coordinator has positively confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionResult {
    pub id: ContainerId,
    pub state: ContainerState,
}

/// Optional settings for a new container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOptions {
    /// Fixed address on the default network.
    #[serde(default)]
    pub static_ip: Option<IpAddr>,
    #[serde(default)]
    pub cpus: Option<f64>,
    /// Memory limit in bytes.
    #[serde(default, rename = "mem_limit")]
    pub memory: Option<i64>,
}

pub(crate) fn uptime_secs(state: ContainerState, started_at: Option<DateTime<Utc>>) -> u64 {
    match (state, started_at) {
        (ContainerState::Running, Some(started)) => {
            (Utc::now() - started).num_seconds().max(0) as u64
        }
        _ => 0,
    }
}
