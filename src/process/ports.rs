//! Free TCP port selection.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use super::control::run_captured;
use crate::config::PortRange;
use crate::error::{AppError, Result};

/// Picks a port in a range that nothing on the host is listening on.
///
/// Best effort only: another allocator may pick the same port before the
/// new server binds it.
pub trait PortAllocator: Send + Sync {
    fn allocate(&self, range: PortRange) -> impl Future<Output = Result<u16>> + Send;
}

/// Lowest port of `range` missing from `bound`.
pub fn first_free_port(bound: &BTreeSet<u16>, range: PortRange) -> Result<u16> {
    range
        .ports()
        .find(|port| !bound.contains(port))
        .ok_or_else(|| AppError::ports_exhausted(range.start, range.end()))
}

/// Extract local listening ports from `netstat -ntl` (or `ss -ntl`) output.
///
/// Both tools put the local address in the fourth column; header lines
/// have no `host:port` there and are skipped.
pub fn parse_listening_ports(table: &str) -> BTreeSet<u16> {
    table
        .lines()
        .filter_map(|line| line.split_whitespace().nth(3))
        .filter_map(|local| local.rsplit_once(':'))
        .filter_map(|(_, port)| port.parse::<u16>().ok())
        .collect()
}

/// Reads the host's listening sockets through `netstat -ntl`.
#[derive(Debug, Clone)]
pub struct NetstatPortAllocator {
    program: String,
    timeout: Option<Duration>,
}

impl NetstatPortAllocator {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub async fn bound_ports(&self) -> Result<BTreeSet<u16>> {
        let output = run_captured(&self.program, &["-ntl".to_string()], self.timeout).await?;
        if !output.success() {
            log::error!("Port check failed: {}", output.output);
            return Err(AppError::external_tool("Could not check ports", output.output));
        }
        Ok(parse_listening_ports(&output.output))
    }
}

impl PortAllocator for NetstatPortAllocator {
    async fn allocate(&self, range: PortRange) -> Result<u16> {
        let bound = self.bound_ports().await?;
        let port = first_free_port(&bound, range)?;
        log::debug!("Allocated port {} from {}", port, range);
        Ok(port)
    }
}
