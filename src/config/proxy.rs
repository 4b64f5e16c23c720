// ABOUTME: Reverse-proxy provisioning configuration.
// ABOUTME: Entry point and snippet locations, reload unit and the default port map.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Top-level server block, created once if absent.
    #[serde(default = "default_entry_point")]
    pub entry_point: PathBuf,

    /// Directory holding one location snippet per container.
    #[serde(default = "default_snippet_dir")]
    pub snippet_dir: PathBuf,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Unit reloaded after the route set changes.
    #[serde(default = "default_service_unit")]
    pub service_unit: String,

    #[serde(default)]
    pub reload_on_retract: bool,

    /// Container port to endpoint label, used when a caller supplies none.
    #[serde(default = "default_ports")]
    pub ports: BTreeMap<u16, String>,
}

fn default_entry_point() -> PathBuf {
    PathBuf::from("/etc/nginx/sites-enabled/nodeapi-central.conf")
}

fn default_snippet_dir() -> PathBuf {
    PathBuf::from("/etc/nginx/snippets/nodeapi")
}

fn default_listen_port() -> u16 {
    9999
}

fn default_service_unit() -> String {
    "nginx.service".to_string()
}

fn default_ports() -> BTreeMap<u16, String> {
    BTreeMap::from([(5801, "novnc".to_string()), (7681, "ttyd".to_string())])
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            entry_point: default_entry_point(),
            snippet_dir: default_snippet_dir(),
            listen_port: default_listen_port(),
            service_unit: default_service_unit(),
            reload_on_retract: false,
            ports: default_ports(),
        }
    }
}
