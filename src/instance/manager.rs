//! The instance manager and its collaborators.

use crate::config::{AppConfig, PortRange};
use crate::error::Result;
use crate::process::{
    check_exit, CommandKind, CommandOutput, InstanceTarget, NetstatPortAllocator, PortAllocator,
    ProcessDriver, SystemProcessDriver,
};

use super::store::{FsInstanceStore, InstanceStore};

/// Composes the store, port allocator and process driver into the instance
/// operations.
///
/// Holds no mutable state: concurrent operations each work on their own
/// records, and the store is the only shared resource.
#[derive(Debug)]
pub struct InstanceManager<S, P, D> {
    pub(super) store: S,
    pub(super) ports: P,
    pub(super) driver: D,
    pub(super) range: PortRange,
}

/// Manager wired to the host filesystem, `netstat` and the 389-ds tools.
pub type SystemInstanceManager =
    InstanceManager<FsInstanceStore, NetstatPortAllocator, SystemProcessDriver>;

impl SystemInstanceManager {
    pub fn from_config(config: &AppConfig) -> Self {
        let commands = &config.commands;
        Self::new(
            FsInstanceStore::new(config.instance_root()),
            NetstatPortAllocator::new(commands.netstat.clone(), commands.timeout()),
            SystemProcessDriver::new(commands),
            config.port_range(),
        )
    }
}

impl<S, P, D> InstanceManager<S, P, D>
where
    S: InstanceStore,
    P: PortAllocator,
    D: ProcessDriver,
{
    pub fn new(store: S, ports: P, driver: D, range: PortRange) -> Self {
        Self {
            store,
            ports,
            driver,
            range,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn port_range(&self) -> PortRange {
        self.range
    }

    /// Lowest free port in the configured range.
    pub async fn allocate_port(&self) -> Result<u16> {
        self.ports.allocate(self.range).await
    }

    /// Run one external command and apply its exit-code policy, logging the
    /// captured output on failure.
    pub(super) async fn run_checked(&self, kind: CommandKind, name: &str) -> Result<CommandOutput> {
        let dir = self.store.instance_dir(name);
        let target = InstanceTarget::new(name, &dir);
        let output = self.driver.run(kind, &target).await?;
        check_exit(kind, output).inspect_err(|e| {
            log::error!(
                "{:?} of {} failed: {}",
                kind,
                name,
                e.detail("output").unwrap_or("(no output)")
            );
        })
    }
}
