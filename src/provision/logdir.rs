// ABOUTME: Per-container log directory layout on the host.
// ABOUTME: `<base>/<hostname>/<name>` bind-mounted read-write into the guest.

use super::ProvisionError;
use crate::config::LogsConfig;
use crate::runtime::MountSpec;
use crate::types::ContainerName;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LogLayout {
    base_dir: PathBuf,
    hostname: String,
    guest_path: String,
}

impl LogLayout {
    /// Layout for this host, named after its hostname.
    pub fn new(config: &LogsConfig) -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        Self::with_hostname(config, hostname)
    }

    pub fn with_hostname(config: &LogsConfig, hostname: impl Into<String>) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            hostname: hostname.into(),
            guest_path: config.guest_path.clone(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn host_dir(&self, name: &ContainerName) -> PathBuf {
        self.base_dir.join(&self.hostname).join(name.as_str())
    }

    /// Bind mount of the container's log directory at the guest path.
    pub fn mount(&self, name: &ContainerName) -> MountSpec {
        MountSpec::Bind {
            source: self.host_dir(name).to_string_lossy().into_owned(),
            target: self.guest_path.clone(),
            read_only: false,
        }
    }

    /// Create the directory if absent.
    pub async fn provision(&self, name: &ContainerName) -> Result<PathBuf, ProvisionError> {
        let dir = self.host_dir(name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ProvisionError::Write {
                path: dir.clone(),
                source,
            })?;
        tracing::debug!(dir = %dir.display(), "log directory ready");
        Ok(dir)
    }

    /// Remove the directory and its contents. Absent is fine.
    pub async fn retract(&self, name: &ContainerName) -> Result<(), ProvisionError> {
        let dir = self.host_dir(name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!(dir = %dir.display(), "log directory removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ProvisionError::Remove { path: dir, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(base: &std::path::Path) -> LogLayout {
        let config = LogsConfig {
            base_dir: base.to_path_buf(),
            ..Default::default()
        };
        LogLayout::with_hostname(&config, "node-1")
    }

    #[test]
    fn host_dir_nests_hostname_then_name() {
        let layout = layout(std::path::Path::new("/var/log"));
        let name = ContainerName::new("demo").unwrap();
        assert_eq!(
            layout.host_dir(&name),
            PathBuf::from("/var/log/node-1/demo")
        );
    }

    #[test]
    fn mount_is_read_write_at_guest_path() {
        let layout = layout(std::path::Path::new("/var/log"));
        let name = ContainerName::new("demo").unwrap();
        assert_eq!(
            layout.mount(&name),
            MountSpec::Bind {
                source: "/var/log/node-1/demo".to_string(),
                target: "/var/log/".to_string(),
                read_only: false,
            }
        );
    }

    #[tokio::test]
    async fn provision_is_idempotent_and_retract_tolerates_absence() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout(tmp.path());
        let name = ContainerName::new("demo").unwrap();

        let dir = layout.provision(&name).await.unwrap();
        std::fs::write(dir.join("app.log"), "line").unwrap();
        layout.provision(&name).await.unwrap();
        assert!(dir.join("app.log").exists());

        layout.retract(&name).await.unwrap();
        assert!(!dir.exists());
        layout.retract(&name).await.unwrap();
    }
}
