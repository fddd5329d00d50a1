//! Spawning and killing external commands.

use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::process::Command;

use super::CommandOutput;
use crate::error::{AppError, Result};

/// Run `program` to completion in its own process group and capture its output.
///
/// The child is not tied to the caller's lifetime: a slow server start keeps
/// running even if the caller goes away. With a `timeout`, the whole group is
/// killed once the limit passes.
pub async fn run_captured(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    log::debug!("Running {} {}", program, args.join(" "));

    let child = cmd.spawn().map_err(|e| {
        AppError::external_tool(format!("Failed to run {program}"), e.to_string())
    })?;
    let pid = child.id();

    let waited = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(waited) => waited,
            Err(_) => {
                if let Some(pid) = pid {
                    if let Err(e) = force_kill_group(pid) {
                        log::warn!("Failed to kill timed-out {}: {}", program, e);
                    }
                }
                return Err(AppError::external_tool(
                    format!("{program} timed out after {}s", limit.as_secs()),
                    "",
                ));
            }
        },
        None => child.wait_with_output().await,
    };

    let output = waited.map_err(|e| {
        AppError::external_tool(format!("Failed to wait for {program}"), e.to_string())
    })?;
    Ok(CommandOutput::from_output(&output))
}

/// Kill the process group led by `pid`.
pub fn force_kill_group(pid: u32) -> Result<()> {
    let raw = i32::try_from(pid)
        .map_err(|_| AppError::internal(format!("PID {pid} out of range")))?;
    killpg(Pid::from_raw(raw), Signal::SIGKILL).map_err(|e| {
        AppError::external_tool(format!("Failed to kill process group {raw}"), e.to_string())
    })
}
