// ABOUTME: Container profile for eBPF probe workloads.
// ABOUTME: Privileged, with the host kernel sources and cgroup tree mounted read-only.

use crate::runtime::MountSpec;
use crate::types::{ContainerName, ContainerNameError};

pub const DEFAULT_PROBE_IMAGE: &str = "base_ebpf:latest";

pub(crate) const PROBE_CAPABILITIES: [&str; 2] = ["CAP_BPF", "CAP_SYS_ADMIN"];

const KERNEL_RELEASE_PATH: &str = "/proc/sys/kernel/osrelease";
const TMPFS_OPTIONS: [&str; 4] = ["rw", "nosuid", "nodev", "noexec"];

pub(crate) async fn kernel_release() -> std::io::Result<String> {
    let release = tokio::fs::read_to_string(KERNEL_RELEASE_PATH).await?;
    Ok(release.trim().to_string())
}

/// A fresh 24-hex-character job name.
pub(crate) fn random_job_name() -> Result<ContainerName, ContainerNameError> {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    ContainerName::new(&hex[..24])
}

/// Host mounts every probe container needs, besides its log directory.
pub(crate) fn probe_mounts(release: &str) -> Vec<MountSpec> {
    let read_only = |path: String| MountSpec::Bind {
        source: path.clone(),
        target: path,
        read_only: true,
    };
    let tmpfs = |target: &str| MountSpec::Tmpfs {
        target: target.to_string(),
        options: TMPFS_OPTIONS.iter().map(|o| o.to_string()).collect(),
    };

    vec![
        read_only(format!("/usr/src/kernels/{}", release)),
        read_only(format!("/lib/modules/{}", release)),
        read_only("/sys/fs/cgroup".to_string()),
        tmpfs("/run"),
        tmpfs("/run/lock"),
    ]
}
