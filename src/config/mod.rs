// ABOUTME: Configuration types and parsing for nodeapi.yml.
// ABOUTME: Every section has defaults, so an empty or missing file is valid.

mod lifecycle;
mod logs;
mod proxy;
mod services;
mod status;

pub use lifecycle::LifecycleConfig;
pub use logs::LogsConfig;
pub use proxy::ProxyConfig;
pub use services::ServicesConfig;
pub use status::StatusConfig;

use crate::error::{Error, Result};
use crate::runtime::RuntimeConfig;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "nodeapi.yml";
pub const CONFIG_FILENAME_ALT: &str = "nodeapi.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".nodeapi/config.yml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub lifecycle: LifecycleConfig,
    pub proxy: ProxyConfig,
    pub logs: LogsConfig,
    pub services: ServicesConfig,
    pub status: StatusConfig,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Load `explicit` if given, else discover in `dir`, else use defaults.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => {
                tracing::debug!(dir = %dir.display(), "no config file found, using defaults");
                Ok(Config::default())
            }
            other => other,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.services.poll_attempts == 0 {
            return Err(Error::InvalidConfig(
                "services.poll_attempts must be at least 1".to_string(),
            ));
        }
        if self.proxy.service_unit.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "proxy.service_unit must not be empty".to_string(),
            ));
        }
        let timeouts = [
            ("lifecycle.transition_timeout", self.lifecycle.transition_timeout),
            ("lifecycle.remove_timeout", self.lifecycle.remove_timeout),
            ("status.host_timeout", self.status.host_timeout),
            ("status.inventory_timeout", self.status.inventory_timeout),
        ];
        if let Some((field, _)) = timeouts.iter().find(|(_, timeout)| timeout.is_zero()) {
            return Err(Error::InvalidConfig(format!(
                "{} must be greater than zero",
                field
            )));
        }
        Ok(())
    }
}
