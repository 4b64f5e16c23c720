// ABOUTME: Test support utilities.
// ABOUTME: Fake runtime, recording proxy reloader, fake host probe and node builders.

// Each test binary only uses some of these items, so allow dead_code.
#[allow(dead_code)]
pub mod fake_runtime;

#[allow(unused_imports)]
pub use fake_runtime::{ExecReply, FakeContainer, FakeRuntime, WaitMode};

use async_trait::async_trait;
use nodeapi::config::{LifecycleConfig, LogsConfig, ProxyConfig, ServicesConfig, StatusConfig};
use nodeapi::lifecycle::Coordinator;
use nodeapi::node::Node;
use nodeapi::provision::{LogLayout, ProvisionError, RouteProvisioner, ServiceReloader};
use nodeapi::status::{HostInfo, HostProbe, StatusError};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("nodeapi=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Counts reloads instead of talking to systemd.
#[derive(Debug, Default)]
pub struct RecordingReloader {
    units: Mutex<Vec<String>>,
    fail: bool,
}

#[allow(dead_code)]
impl RecordingReloader {
    pub fn failing() -> Self {
        Self {
            units: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn reloads(&self) -> Vec<String> {
        self.units.lock().clone()
    }
}

#[async_trait]
impl ServiceReloader for RecordingReloader {
    async fn reload(&self, unit: &str) -> Result<(), ProvisionError> {
        self.units.lock().push(unit.to_string());
        if self.fail {
            return Err(ProvisionError::Reload {
                unit: unit.to_string(),
                message: "Job for nginx.service failed".to_string(),
            });
        }
        Ok(())
    }
}

/// Host probe returning canned facts after an optional delay.
#[derive(Debug, Clone, Default)]
pub struct FakeHostProbe {
    pub info: HostInfo,
    pub delay: Duration,
}

#[allow(dead_code)]
impl FakeHostProbe {
    pub fn new(node_id: &str) -> Self {
        Self {
            info: HostInfo {
                node_id: node_id.to_string(),
                os_name: "Debian GNU/Linux".to_string(),
                os_version: "12".to_string(),
                cpu_count: 4,
                cpu_percent: 12.5,
                mem_percent: 40.0,
                total_memory: 8 * 1024 * 1024 * 1024,
                num_containers: 0,
                ip_address: "192.168.1.20".to_string(),
            },
            delay: Duration::ZERO,
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl HostProbe for FakeHostProbe {
    async fn host_info(&self) -> Result<HostInfo, StatusError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.info.clone())
    }
}

#[allow(dead_code)]
pub fn lifecycle_config() -> LifecycleConfig {
    LifecycleConfig {
        transition_timeout: Duration::from_millis(200),
        stop_grace: Duration::from_secs(1),
        remove_timeout: Duration::from_secs(1),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn logs_config(base: &Path) -> LogsConfig {
    LogsConfig {
        base_dir: base.to_path_buf(),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn proxy_config(base: &Path) -> ProxyConfig {
    ProxyConfig {
        entry_point: base.join("sites-enabled/nodeapi-central.conf"),
        snippet_dir: base.join("snippets/nodeapi"),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn services_config() -> ServicesConfig {
    ServicesConfig {
        poll_interval: Duration::from_millis(10),
        poll_attempts: 5,
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn coordinator(base: &Path) -> Coordinator {
    init_tracing();
    Coordinator::new(
        lifecycle_config(),
        LogLayout::with_hostname(&logs_config(&base.join("logs")), "node-1"),
    )
}

/// A node over `runtime` whose files all live under `base`.
#[allow(dead_code)]
pub fn node(runtime: Arc<FakeRuntime>, base: &Path) -> Node<FakeRuntime, RecordingReloader> {
    Node::new(
        runtime,
        coordinator(base),
        RouteProvisioner::with_reloader(proxy_config(base), RecordingReloader::default()),
        nodeapi::guest::ServiceControl::new(services_config()),
        StatusConfig {
            host_timeout: Duration::from_millis(200),
            inventory_timeout: Duration::from_millis(200),
        },
    )
}
