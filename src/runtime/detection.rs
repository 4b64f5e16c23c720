// ABOUTME: Resolves which runtime socket to connect to on this host.
// ABOUTME: Explicit config wins; otherwise the Podman socket, then Docker's.

use super::types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};
use std::path::Path;

const DEFAULT_RUNTIME_DIR: &str = "/var/run";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Podman socket under `$XDG_RUNTIME_DIR`, or under `/var/run` when unset.
pub fn podman_socket_path() -> String {
    let dir = std::env::var("XDG_RUNTIME_DIR")
        .ok()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DEFAULT_RUNTIME_DIR.to_string());
    format!("{}/podman/podman.sock", dir.trim_end_matches('/'))
}

pub fn default_socket_path(runtime: RuntimeType) -> String {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET.to_string(),
        RuntimeType::Podman => podman_socket_path(),
    }
}

/// Resolve the runtime endpoint for this node.
///
/// Order:
/// 1. Explicit `type` (with optional `socket` override)
/// 2. Explicit `socket` alone, treated as Podman
/// 3. Podman socket if present
/// 4. Docker socket if present
/// 5. Podman socket path, so the connection attempt reports the failure
pub fn resolve_endpoint(config: &RuntimeConfig) -> RuntimeEndpoint {
    if let Some(runtime_type) = config.runtime {
        let socket_path = config
            .socket
            .clone()
            .unwrap_or_else(|| default_socket_path(runtime_type));
        return RuntimeEndpoint {
            runtime_type,
            socket_path,
        };
    }

    if let Some(ref socket) = config.socket {
        return RuntimeEndpoint {
            runtime_type: RuntimeType::Podman,
            socket_path: socket.clone(),
        };
    }

    let podman = podman_socket_path();
    if Path::new(&podman).exists() {
        return RuntimeEndpoint {
            runtime_type: RuntimeType::Podman,
            socket_path: podman,
        };
    }

    if Path::new(DOCKER_SOCKET).exists() {
        return RuntimeEndpoint {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        };
    }

    tracing::debug!(socket = %podman, "no runtime socket found, defaulting to podman");
    RuntimeEndpoint {
        runtime_type: RuntimeType::Podman,
        socket_path: podman,
    }
}
