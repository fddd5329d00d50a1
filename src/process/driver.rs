//! Directory-server provisioning and control tools.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use super::control::run_captured;
use super::CommandOutput;
use crate::config::CommandsConfig;
use crate::error::{AppError, Result};
use crate::paths::{get_install_path, get_setup_log_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Run the setup tool against the instance's install file.
    Install,
    /// Halt the instance's server process.
    Stop,
    /// Stop then start; also starts an instance that was not running.
    Restart,
}

impl CommandKind {
    /// Exit codes treated as success.
    pub fn success_codes(self) -> &'static [i32] {
        match self {
            Self::Install => &[0],
            Self::Stop => &[0],
            // 2: was not running, now started
            Self::Restart => &[0, 2],
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Self::Install => "Could not create instance",
            Self::Stop => "Could not stop instance",
            Self::Restart => "Could not restart instance",
        }
    }
}

/// The instance a command acts on.
#[derive(Debug, Clone, Copy)]
pub struct InstanceTarget<'a> {
    pub name: &'a str,
    pub dir: &'a Path,
}

impl<'a> InstanceTarget<'a> {
    pub fn new(name: &'a str, dir: &'a Path) -> Self {
        Self { name, dir }
    }
}

/// Runs one provisioning/control command and reports its raw result.
/// Exit-code interpretation is left to [`check_exit`].
pub trait ProcessDriver: Send + Sync {
    fn run(
        &self,
        kind: CommandKind,
        target: &InstanceTarget<'_>,
    ) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Apply the success-code policy of `kind` to a command result.
pub fn check_exit(kind: CommandKind, output: CommandOutput) -> Result<CommandOutput> {
    match output.exit_code {
        Some(code) if kind.success_codes().contains(&code) => Ok(output),
        code => Err(AppError::external_tool(kind.failure_message(), output.output).with(
            "exit_code",
            code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
        )),
    }
}

/// Drives the 389 Directory Server tools installed on the host.
#[derive(Debug, Clone)]
pub struct SystemProcessDriver {
    setup: String,
    stop: String,
    restart: String,
    timeout: Option<Duration>,
}

impl SystemProcessDriver {
    pub fn new(commands: &CommandsConfig) -> Self {
        Self {
            setup: commands.setup.clone(),
            stop: commands.stop.clone(),
            restart: commands.restart.clone(),
            timeout: commands.timeout(),
        }
    }

    /// Program and arguments for `kind` against `target`.
    pub fn command_line(
        &self,
        kind: CommandKind,
        target: &InstanceTarget<'_>,
    ) -> (&str, Vec<String>) {
        match kind {
            CommandKind::Install => (
                self.setup.as_str(),
                vec![
                    format!("--file={}", get_install_path(target.dir).display()),
                    "--silent".to_string(),
                    format!("--logfile={}", get_setup_log_path(target.dir).display()),
                ],
            ),
            CommandKind::Stop => (self.stop.as_str(), instance_args(target)),
            CommandKind::Restart => (self.restart.as_str(), instance_args(target)),
        }
    }
}

fn instance_args(target: &InstanceTarget<'_>) -> Vec<String> {
    vec![
        "-d".to_string(),
        target.dir.display().to_string(),
        target.name.to_string(),
    ]
}

impl ProcessDriver for SystemProcessDriver {
    async fn run(&self, kind: CommandKind, target: &InstanceTarget<'_>) -> Result<CommandOutput> {
        let (program, args) = self.command_line(kind, target);
        run_captured(program, &args, self.timeout).await
    }
}
