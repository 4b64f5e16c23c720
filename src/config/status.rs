// ABOUTME: Node status reporting configuration.
// ABOUTME: Independent timeouts for host telemetry and container inventory.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusConfig {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub host_timeout: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub inventory_timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for StatusConfig {
    fn default() -> Self {
        StatusConfig {
            host_timeout: default_timeout(),
            inventory_timeout: default_timeout(),
        }
    }
}
