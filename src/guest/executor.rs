// ABOUTME: Runs one command inside a running container through an exec session.
// ABOUTME: `run` reports any exit code; `exec` turns a non-zero exit into an error.

use super::GuestError;
use crate::runtime::{ContainerOps, ExecConfig, ExecOps};
use crate::types::ContainerId;
use std::time::Duration;

const EXIT_CODE_ATTEMPTS: u32 = 20;
const EXIT_CODE_INTERVAL: Duration = Duration::from_millis(50);

/// Captured output of a finished command, trailing whitespace trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run `command` to completion and report its output whatever the exit code.
pub async fn run<R>(runtime: &R, id: &ContainerId, command: &[String]) -> Result<ExecResult, GuestError>
where
    R: ContainerOps + ExecOps + ?Sized,
{
    let info = runtime
        .inspect_container(id)
        .await
        .map_err(|source| GuestError::Inspect {
            id: id.to_string(),
            source,
        })?;
    if !info.state.is_running() {
        return Err(GuestError::ContainerNotRunning(id.to_string()));
    }

    let exec_err = |source| GuestError::Exec {
        id: id.to_string(),
        source,
    };

    tracing::debug!(container = %id, ?command, "exec");
    let exec_id = runtime
        .exec_create(id, &ExecConfig::command(command.iter().cloned()))
        .await
        .map_err(exec_err)?;
    let output = runtime.exec_start(&exec_id).await.map_err(exec_err)?;
    let exit_code = settled_exit_code(runtime, &exec_id).await.map_err(exec_err)?;

    Ok(ExecResult {
        stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        exit_code,
    })
}

/// Run `command` and require a zero exit code.
///
/// # Errors
///
/// `ContainerNotRunning` before any session is created, `CommandFailed`
/// with the captured stderr on a non-zero exit.
pub async fn exec<R>(runtime: &R, id: &ContainerId, command: &[String]) -> Result<ExecResult, GuestError>
where
    R: ContainerOps + ExecOps + ?Sized,
{
    let result = run(runtime, id, command).await?;
    if !result.success() {
        return Err(GuestError::CommandFailed {
            exit_code: result.exit_code,
            stderr: result.stderr,
        });
    }
    Ok(result)
}

/// The runtime may report the session as running briefly after output ends.
async fn settled_exit_code<R>(runtime: &R, exec_id: &str) -> Result<i64, crate::runtime::ExecError>
where
    R: ExecOps + ?Sized,
{
    let mut info = runtime.exec_inspect(exec_id).await?;
    for _ in 1..EXIT_CODE_ATTEMPTS {
        if let (false, Some(code)) = (info.running, info.exit_code) {
            return Ok(code);
        }
        tokio::time::sleep(EXIT_CODE_INTERVAL).await;
        info = runtime.exec_inspect(exec_id).await?;
    }
    Ok(info.exit_code.unwrap_or(-1))
}
