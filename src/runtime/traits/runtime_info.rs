// ABOUTME: Runtime reachability trait for container runtimes.
// ABOUTME: A ping is how a fresh connection is verified before it is cached.

use async_trait::async_trait;

/// Runtime reachability.
#[async_trait]
pub trait RuntimeInfo: Send + Sync {
    /// Ping the runtime to check connectivity.
    async fn ping(&self) -> Result<(), RuntimeInfoError>;
}

/// Errors from runtime info operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
