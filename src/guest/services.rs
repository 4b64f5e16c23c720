// ABOUTME: Managed systemd services inside a container.
// ABOUTME: Lists prefixed unit files and starts or stops them with confirmed state.

use super::executor::{exec, run};
use super::GuestError;
use crate::config::ServicesConfig;
use crate::runtime::{ContainerOps, ExecOps};
use crate::types::{ContainerId, UnitName};
use serde::Serialize;

const ACTIVE: &str = "active";
const INACTIVE: &str = "inactive";

/// One managed unit and whether it is currently active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedService {
    pub name: String,
    pub active: bool,
}

/// Service control for units matching the configured prefix.
#[derive(Debug, Clone)]
pub struct ServiceControl {
    config: ServicesConfig,
}

impl ServiceControl {
    pub fn new(config: ServicesConfig) -> Self {
        Self { config }
    }

    /// Unit files in the unit directory whose name starts with the prefix.
    pub async fn list_services<R>(
        &self,
        runtime: &R,
        id: &ContainerId,
    ) -> Result<Vec<ManagedService>, GuestError>
    where
        R: ContainerOps + ExecOps + ?Sized,
    {
        let find = [
            "find".to_string(),
            self.config.unit_dir.clone(),
            "-maxdepth".to_string(),
            "1".to_string(),
            "-type".to_string(),
            "f".to_string(),
            "-name".to_string(),
            format!("{}*", self.config.prefix),
            "-printf".to_string(),
            "%f\\n".to_string(),
        ];
        let listing = exec(runtime, id, &find).await?;

        let mut services = Vec::new();
        for line in listing.stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let unit = match UnitName::new(line) {
                Ok(unit) => unit,
                Err(e) => {
                    tracing::warn!(container = %id, file = line, error = %e, "skipping unit file");
                    continue;
                }
            };
            let state = self.unit_state(runtime, id, &unit).await?;
            services.push(ManagedService {
                name: unit.to_string(),
                active: state == ACTIVE,
            });
        }
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    /// Start the unit and wait for systemd to report it active.
    pub async fn start_service<R>(
        &self,
        runtime: &R,
        id: &ContainerId,
        unit: &UnitName,
    ) -> Result<ManagedService, GuestError>
    where
        R: ContainerOps + ExecOps + ?Sized,
    {
        self.transition(runtime, id, unit, "start", ACTIVE).await
    }

    /// Stop the unit and wait for systemd to report it inactive.
    pub async fn stop_service<R>(
        &self,
        runtime: &R,
        id: &ContainerId,
        unit: &UnitName,
    ) -> Result<ManagedService, GuestError>
    where
        R: ContainerOps + ExecOps + ?Sized,
    {
        self.transition(runtime, id, unit, "stop", INACTIVE).await
    }

    async fn transition<R>(
        &self,
        runtime: &R,
        id: &ContainerId,
        unit: &UnitName,
        verb: &str,
        expected: &'static str,
    ) -> Result<ManagedService, GuestError>
    where
        R: ContainerOps + ExecOps + ?Sized,
    {
        let command = [
            "systemctl".to_string(),
            verb.to_string(),
            unit.to_string(),
        ];
        exec(runtime, id, &command).await?;

        let mut actual = String::new();
        for attempt in 0..self.config.poll_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.poll_interval).await;
            }
            actual = self.unit_state(runtime, id, unit).await?;
            if actual == expected {
                tracing::info!(container = %id, %unit, state = expected, "service {}", verb);
                return Ok(ManagedService {
                    name: unit.to_string(),
                    active: expected == ACTIVE,
                });
            }
        }

        Err(GuestError::ServiceState {
            unit: unit.to_string(),
            expected,
            actual,
        })
    }

    /// `systemctl is-active` exits non-zero for anything but active, so read
    /// stdout whatever the exit code.
    async fn unit_state<R>(
        &self,
        runtime: &R,
        id: &ContainerId,
        unit: &UnitName,
    ) -> Result<String, GuestError>
    where
        R: ContainerOps + ExecOps + ?Sized,
    {
        let command = [
            "systemctl".to_string(),
            "is-active".to_string(),
            unit.to_string(),
        ];
        let result = run(runtime, id, &command).await?;
        let state = result.stdout.trim();
        if state.is_empty() {
            return Ok("unknown".to_string());
        }
        Ok(state.to_string())
    }
}
