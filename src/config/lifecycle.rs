// ABOUTME: Container lifecycle timing configuration.
// ABOUTME: Bounded transition waits, stop grace period and removal timeout.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// How long start and stop wait for the target state.
    #[serde(default = "default_transition_timeout", with = "humantime_serde")]
    pub transition_timeout: Duration,

    /// Runtime-side grace period before a stopping container is killed.
    #[serde(default = "default_stop_grace", with = "humantime_serde")]
    pub stop_grace: Duration,

    #[serde(default = "default_remove_timeout", with = "humantime_serde")]
    pub remove_timeout: Duration,

    /// Network a static IP is assigned on.
    #[serde(default = "default_network")]
    pub default_network: String,
}

fn default_transition_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_stop_grace() -> Duration {
    Duration::from_secs(10)
}

fn default_remove_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_network() -> String {
    "podman".to_string()
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            transition_timeout: default_transition_timeout(),
            stop_grace: default_stop_grace(),
            remove_timeout: default_remove_timeout(),
            default_network: default_network(),
        }
    }
}
