// ABOUTME: In-guest managed service configuration.
// ABOUTME: Unit directory, name prefix and state polling parameters.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicesConfig {
    #[serde(default = "default_unit_dir")]
    pub unit_dir: String,

    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
}

fn default_unit_dir() -> String {
    "/etc/systemd/system".to_string()
}

fn default_prefix() -> String {
    "ebpf_".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_poll_attempts() -> u32 {
    10
}

impl Default for ServicesConfig {
    fn default() -> Self {
        ServicesConfig {
            unit_dir: default_unit_dir(),
            prefix: default_prefix(),
            poll_interval: default_poll_interval(),
            poll_attempts: default_poll_attempts(),
        }
    }
}
