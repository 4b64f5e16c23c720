// ABOUTME: Proxy service reload hook.
// ABOUTME: Production implementation asks systemd to reload the unit with job mode replace.

use super::ProvisionError;
use async_trait::async_trait;
use tokio::process::Command;

/// Makes a service pick up changed configuration.
#[async_trait]
pub trait ServiceReloader: Send + Sync {
    async fn reload(&self, unit: &str) -> Result<(), ProvisionError>;
}

/// Reloads units through `systemctl`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemctlReloader;

#[async_trait]
impl ServiceReloader for SystemctlReloader {
    async fn reload(&self, unit: &str) -> Result<(), ProvisionError> {
        tracing::debug!(unit, "reloading service");

        let output = Command::new("systemctl")
            .args(["reload", "--job-mode=replace", unit])
            .output()
            .await
            .map_err(|e| ProvisionError::Reload {
                unit: unit.to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ProvisionError::Reload {
                unit: unit.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
