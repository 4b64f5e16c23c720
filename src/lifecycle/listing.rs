// ABOUTME: Container inventory aggregation.
// ABOUTME: One list call, then per-container inspect and stats resolved concurrently.

use super::LifecycleError;
use super::record::{ContainerRecord, uptime_secs};
use crate::runtime::{ContainerFilters, ContainerOps, ContainerStats, ContainerSummary};
use futures::future::join_all;

/// Every container, running or not, in runtime listing order.
///
/// Per-container IP, timestamps and stats are best-effort: a failed lookup
/// leaves those fields empty or zero instead of failing the listing.
pub(crate) async fn collect_records<R>(runtime: &R) -> Result<Vec<ContainerRecord>, LifecycleError>
where
    R: ContainerOps + ?Sized,
{
    let summaries = runtime
        .list_containers(&ContainerFilters::all())
        .await
        .map_err(LifecycleError::List)?;

    tracing::debug!(count = summaries.len(), "building container inventory");
    Ok(join_all(summaries.into_iter().map(|s| build_record(runtime, s))).await)
}

async fn build_record<R>(runtime: &R, summary: ContainerSummary) -> ContainerRecord
where
    R: ContainerOps + ?Sized,
{
    let id = summary.id;

    let (ip, started_at, exited_at, exit_code) = match runtime.inspect_container(&id).await {
        Ok(info) => (
            info.ip_address().unwrap_or_default().to_string(),
            info.started_at,
            info.finished_at,
            info.exit_code,
        ),
        Err(e) => {
            tracing::warn!(container = %id, error = %e, "inspect failed, leaving address empty");
            (String::new(), None, None, None)
        }
    };

    let stats = if summary.state.is_running() {
        runtime.container_stats(&id).await.unwrap_or_else(|e| {
            tracing::warn!(container = %id, error = %e, "stats unavailable, reporting zero");
            ContainerStats::default()
        })
    } else {
        ContainerStats::default()
    };

    let exited = summary.state == crate::runtime::ContainerState::Exited;

    ContainerRecord {
        image: summary.image,
        names: summary.names,
        state: summary.state,
        started_at,
        ports: summary.ports,
        ip,
        networks: summary.networks,
        exited,
        exit_code: if exited { exit_code } else { None },
        exited_at: if exited { exited_at } else { None },
        status: summary.status,
        cpu_percent: stats.cpu_percent,
        memory_percent: stats.memory_percent,
        uptime: uptime_secs(summary.state, started_at),
        id,
    }
}
