// ABOUTME: Reverse-proxy route provisioning for containers.
// ABOUTME: One location snippet per container under a lazily created server block.

use super::{ProvisionError, ServiceReloader, SystemctlReloader};
use crate::config::ProxyConfig;
use crate::types::ContainerName;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Routes under `/<path>/<label>/` to `<target>:<port>` for each mapped port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    path: ContainerName,
    target: IpAddr,
    ports: BTreeMap<u16, String>,
}

impl RouteSpec {
    pub fn new(
        path: ContainerName,
        target: IpAddr,
        ports: BTreeMap<u16, String>,
    ) -> Result<Self, ProvisionError> {
        if ports.is_empty() {
            return Err(ProvisionError::InvalidRoute(format!(
                "{}: no ports to route",
                path
            )));
        }
        for label in ports.values() {
            let valid = !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(ProvisionError::InvalidRoute(format!(
                    "{}: bad endpoint label {:?}",
                    path, label
                )));
            }
        }
        Ok(Self {
            path,
            target,
            ports,
        })
    }

    pub fn path(&self) -> &ContainerName {
        &self.path
    }

    pub fn target(&self) -> IpAddr {
        self.target
    }

    /// Location blocks for every port, in ascending port order.
    pub fn render(&self) -> String {
        let host = match self.target {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{}]", v6),
        };
        let mut out = String::new();
        for (port, label) in &self.ports {
            let _ = write!(
                out,
                "location /{path}/{label}/ {{\n    \
                 proxy_pass http://{host}:{port};\n    \
                 proxy_set_header Host $host;\n    \
                 proxy_set_header X-Real-IP $remote_addr;\n    \
                 proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n    \
                 proxy_http_version 1.1;\n    \
                 proxy_set_header Upgrade $http_upgrade;\n    \
                 proxy_set_header Connection 'upgrade';\n    \
                 proxy_cache_bypass $http_upgrade;\n\
                 }}\n\n",
                path = self.path,
            );
        }
        out
    }
}

/// Writes and removes route snippets, reloading the proxy afterwards.
pub struct RouteProvisioner<L = SystemctlReloader> {
    config: ProxyConfig,
    reloader: L,
}

impl RouteProvisioner<SystemctlReloader> {
    pub fn new(config: ProxyConfig) -> Self {
        Self::with_reloader(config, SystemctlReloader)
    }
}

impl<L: ServiceReloader> RouteProvisioner<L> {
    pub fn with_reloader(config: ProxyConfig, reloader: L) -> Self {
        Self { config, reloader }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn reloader(&self) -> &L {
        &self.reloader
    }

    pub fn snippet_path(&self, path: &ContainerName) -> PathBuf {
        self.config
            .snippet_dir
            .join(format!("{}.conf", path.as_str()))
    }

    /// Route with the configured default port map.
    pub fn default_route(
        &self,
        path: ContainerName,
        target: IpAddr,
    ) -> Result<RouteSpec, ProvisionError> {
        RouteSpec::new(path, target, self.config.ports.clone())
    }

    /// Install or replace the route, then reload the proxy.
    ///
    /// # Errors
    ///
    /// Stops at the first failing step; earlier steps are not undone.
    pub async fn provision_route(&self, spec: &RouteSpec) -> Result<PathBuf, ProvisionError> {
        self.ensure_entry_point().await?;

        let dir = &self.config.snippet_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| ProvisionError::Write {
                path: dir.clone(),
                source,
            })?;

        let path = self.snippet_path(spec.path());
        write_atomic(&path, spec.render().as_bytes()).await?;
        tracing::debug!(route = %spec.path(), file = %path.display(), "route written");

        self.reloader.reload(&self.config.service_unit).await?;
        tracing::info!(route = %spec.path(), target = %spec.target(), "route provisioned");
        Ok(path)
    }

    /// Delete the route's snippet.
    ///
    /// # Errors
    ///
    /// `RouteNotFound` if no snippet exists for `path`.
    pub async fn retract_route(&self, path: &ContainerName) -> Result<(), ProvisionError> {
        let file = self.snippet_path(path);
        match tokio::fs::remove_file(&file).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProvisionError::RouteNotFound(path.to_string()));
            }
            Err(source) => return Err(ProvisionError::Remove { path: file, source }),
        }

        if self.config.reload_on_retract {
            self.reloader.reload(&self.config.service_unit).await?;
        }
        tracing::info!(route = %path, "route retracted");
        Ok(())
    }

    fn entry_point_contents(&self) -> String {
        format!(
            "server {{\n    listen {};\n    server_name localhost;\n\n    include {}/*.conf;\n}}\n",
            self.config.listen_port,
            self.config.snippet_dir.display()
        )
    }

    /// Create the top-level server block unless it already exists.
    ///
    /// The block is written to a temp file first and hard-linked into place,
    /// so the entry point is either absent or complete.
    async fn ensure_entry_point(&self) -> Result<(), ProvisionError> {
        let path = &self.config.entry_point;
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| ProvisionError::Write {
                path: path.clone(),
                source,
            })?;
        if exists {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ProvisionError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let tmp = write_temp(path, self.entry_point_contents().as_bytes()).await?;
        let linked = tokio::fs::hard_link(&tmp, path).await;
        discard_temp(&tmp).await;
        match linked {
            Ok(()) => {
                tracing::info!(file = %path.display(), "proxy entry point created");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(ProvisionError::Write {
                path: path.clone(),
                source,
            }),
        }
    }
}

/// Write through a uniquely named sibling temp file and rename over the target.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ProvisionError> {
    let tmp = write_temp(path, contents).await?;
    if let Err(source) = tokio::fs::rename(&tmp, path).await {
        discard_temp(&tmp).await;
        return Err(ProvisionError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

/// Write `contents` to a fresh hidden file next to `path` and sync it.
/// Every call gets its own file, so concurrent writers never share one.
async fn write_temp(path: &Path, contents: &[u8]) -> Result<PathBuf, ProvisionError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(
        ".{}.{}.tmp",
        file_name,
        uuid::Uuid::new_v4().simple()
    ));
    let write_err = |source| ProvisionError::Write {
        path: path.to_path_buf(),
        source,
    };

    let written: std::io::Result<()> = async {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .await?;
        file.write_all(contents).await?;
        file.sync_all().await
    }
    .await;

    match written {
        Ok(()) => Ok(tmp),
        Err(source) => {
            discard_temp(&tmp).await;
            Err(write_err(source))
        }
    }
}

async fn discard_temp(tmp: &Path) {
    if let Err(e) = tokio::fs::remove_file(tmp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(file = %tmp.display(), error = %e, "failed to remove temp file");
        }
    }
}
