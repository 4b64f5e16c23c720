// ABOUTME: Exec operations trait for container runtimes.
// ABOUTME: Create, run and inspect exec sessions inside running containers.

use super::shared_types::{ExecConfig, ExecInfo, ExecOutput};
use crate::types::ContainerId;
use async_trait::async_trait;

/// Exec operations: run commands in containers.
#[async_trait]
pub trait ExecOps: Send + Sync {
    /// Create an exec session without starting it.
    async fn exec_create(
        &self,
        container: &ContainerId,
        config: &ExecConfig,
    ) -> Result<String, ExecError>;

    /// Start a created session and collect its output until it exits.
    async fn exec_start(&self, exec_id: &str) -> Result<ExecOutput, ExecError>;

    /// Inspect a session, including its exit code once finished.
    async fn exec_inspect(&self, exec_id: &str) -> Result<ExecInfo, ExecError>;
}

/// Errors from exec operations.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("container not running: {0}")]
    ContainerNotRunning(String),

    #[error("exec instance not found: {0}")]
    ExecNotFound(String),

    #[error("exec failed: {0}")]
    Failed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
