// ABOUTME: Lazily established, process-wide runtime connection.
// ABOUTME: Concurrent first callers share one attempt; failures are retried on next use.

use super::bollard::BollardRuntime;
use super::detection::resolve_endpoint;
use super::error::RuntimeError;
use super::types::{RuntimeConfig, RuntimeEndpoint};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::OnceCell;

type Connector<R> =
    Box<dyn Fn(RuntimeEndpoint) -> BoxFuture<'static, Result<R, RuntimeError>> + Send + Sync>;

/// Hands out a shared runtime handle, connecting on first use.
///
/// A successful connection is cached for the life of the manager. A failed
/// attempt is not, so the next caller tries again.
pub struct ConnectionManager<R = BollardRuntime> {
    endpoint: RuntimeEndpoint,
    handle: OnceCell<Arc<R>>,
    connector: Connector<R>,
}

impl ConnectionManager<BollardRuntime> {
    /// Resolve the endpoint from config. Nothing is dialed until `connect`.
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::for_endpoint(resolve_endpoint(config))
    }

    pub fn for_endpoint(endpoint: RuntimeEndpoint) -> Self {
        Self::with_connector(endpoint, |endpoint| {
            Box::pin(async move { BollardRuntime::connect_verified(&endpoint).await })
        })
    }
}

impl<R> ConnectionManager<R>
where
    R: Send + Sync + 'static,
{
    pub fn with_connector<F>(endpoint: RuntimeEndpoint, connector: F) -> Self
    where
        F: Fn(RuntimeEndpoint) -> BoxFuture<'static, Result<R, RuntimeError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            endpoint,
            handle: OnceCell::new(),
            connector: Box::new(connector),
        }
    }

    /// Return the shared handle, connecting if no connection exists yet.
    pub async fn connect(&self) -> Result<Arc<R>, RuntimeError> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                tracing::debug!(
                    runtime = %self.endpoint.runtime_type,
                    socket = %self.endpoint.socket_path,
                    "connecting to container runtime"
                );
                let runtime = (self.connector)(self.endpoint.clone())
                    .await
                    .inspect_err(|e| tracing::warn!(error = %e, "runtime connection failed"))?;
                tracing::info!(
                    runtime = %self.endpoint.runtime_type,
                    socket = %self.endpoint.socket_path,
                    "connected to container runtime"
                );
                Ok::<_, RuntimeError>(Arc::new(runtime))
            })
            .await?;
        Ok(Arc::clone(handle))
    }

    pub fn endpoint(&self) -> &RuntimeEndpoint {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }
}
