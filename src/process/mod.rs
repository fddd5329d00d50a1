//! External tool invocation.
//!
//! - `driver`: the directory-server install/stop/restart tools and their
//!   per-command exit-code policy
//! - `ports`: free-port selection from the host's listening-socket table
//! - `control`: detached spawning with captured output and process-group kill

mod control;
mod driver;
mod ports;

pub use control::{force_kill_group, run_captured};
pub use driver::{check_exit, CommandKind, InstanceTarget, ProcessDriver, SystemProcessDriver};
pub use ports::{first_free_port, parse_listening_ports, NetstatPortAllocator, PortAllocator};

/// Exit status and combined output of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Stdout followed by stderr.
    pub output: String,
}

impl CommandOutput {
    pub fn new(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    pub(crate) fn from_output(output: &std::process::Output) -> Self {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = match (stdout.trim_end(), stderr.trim_end()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{out}\n{err}"),
        };
        Self::new(output.status.code(), combined)
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}
