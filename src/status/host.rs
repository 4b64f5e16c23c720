// ABOUTME: Host telemetry read from the local machine.
// ABOUTME: Hostname, os-release, /proc CPU and memory counters and the outbound address.

use super::{HostInfo, HostProbe, StatusError};
use async_trait::async_trait;
use std::time::Duration;

const CPU_SAMPLE_WINDOW: Duration = Duration::from_millis(250);
const OUTBOUND_PROBE: &str = "8.8.8.8:80";

/// Reads telemetry from `/proc` and `/etc` on this host.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHostProbe;

#[async_trait]
impl HostProbe for LocalHostProbe {
    async fn host_info(&self) -> Result<HostInfo, StatusError> {
        let os_release = read("/etc/os-release", "os-release").await?;
        let (os_name, os_version) = parse_os_release(&os_release);

        let before = parse_cpu_line(&read("/proc/stat", "cpu counters").await?);
        tokio::time::sleep(CPU_SAMPLE_WINDOW).await;
        let after = parse_cpu_line(&read("/proc/stat", "cpu counters").await?);
        let cpu_percent = match (before, after) {
            (Some(before), Some(after)) => busy_percent(before, after),
            _ => 0.0,
        };

        let (total_memory, mem_percent) = parse_meminfo(&read("/proc/meminfo", "meminfo").await?);

        Ok(HostInfo {
            node_id: gethostname::gethostname().to_string_lossy().into_owned(),
            os_name,
            os_version,
            cpu_count: std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1),
            cpu_percent,
            mem_percent,
            total_memory,
            num_containers: 0,
            ip_address: outbound_ip().await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "cannot determine outbound address");
                String::new()
            }),
        })
    }
}

async fn read(path: &str, what: &'static str) -> Result<String, StatusError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StatusError::Host { what, source })
}

/// Local address the kernel would use for outbound traffic. Sends nothing.
async fn outbound_ip() -> std::io::Result<String> {
    let socket = tokio::net::UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(OUTBOUND_PROBE).await?;
    Ok(socket.local_addr()?.ip().to_string())
}

fn parse_os_release(contents: &str) -> (String, String) {
    let mut name = String::new();
    let mut version = String::new();
    for line in contents.lines() {
        if let Some(value) = line.strip_prefix("NAME=") {
            name = value.trim_matches('"').to_string();
        } else if let Some(value) = line.strip_prefix("VERSION=") {
            version = value.trim_matches('"').to_string();
        }
    }
    (name, version)
}

/// (busy, total) jiffies from the aggregate `cpu` line.
fn parse_cpu_line(stat: &str) -> Option<(u64, u64)> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|v| v.parse().ok())
        .collect();
    if values.len() < 4 {
        return None;
    }
    let total: u64 = values.iter().sum();
    // idle + iowait
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Some((total - idle, total))
}

fn busy_percent(before: (u64, u64), after: (u64, u64)) -> f64 {
    let busy = after.0.saturating_sub(before.0) as f64;
    let total = after.1.saturating_sub(before.1) as f64;
    if total == 0.0 {
        return 0.0;
    }
    busy / total * 100.0
}

/// Total bytes and used percentage (total minus available).
fn parse_meminfo(contents: &str) -> (u64, f64) {
    let field = |name: &str| {
        contents
            .lines()
            .find(|l| l.starts_with(name))
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|kb| kb.parse::<u64>().ok())
            .map(|kb| kb * 1024)
    };

    let total = field("MemTotal:").unwrap_or(0);
    let available = field("MemAvailable:").unwrap_or(total);
    if total == 0 {
        return (0, 0.0);
    }
    (total, total.saturating_sub(available) as f64 / total as f64 * 100.0)
}
