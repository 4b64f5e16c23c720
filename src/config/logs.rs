// ABOUTME: Host log-directory layout configuration.
// ABOUTME: Base directory on the host and the mount point inside containers.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogsConfig {
    /// Per-container directories live at `<base_dir>/<hostname>/<name>`.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    #[serde(default = "default_guest_path")]
    pub guest_path: String,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("/var/log")
}

fn default_guest_path() -> String {
    "/var/log/".to_string()
}

impl Default for LogsConfig {
    fn default() -> Self {
        LogsConfig {
            base_dir: default_base_dir(),
            guest_path: default_guest_path(),
        }
    }
}
