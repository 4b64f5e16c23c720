// ABOUTME: Error types for side-effect provisioning.
// ABOUTME: Filesystem failures carry the path they happened on.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no route provisioned for {0}")]
    RouteNotFound(String),

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("failed to reload {unit}: {message}")]
    Reload { unit: String, message: String },
}
