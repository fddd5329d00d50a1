//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use ldapaas::error::Result;
use ldapaas::instance::{FsInstanceStore, InstanceManager};
use ldapaas::process::{
    first_free_port, CommandKind, CommandOutput, InstanceTarget, PortAllocator, ProcessDriver,
};
use ldapaas::PortRange;
use tempfile::TempDir;

/// Ports reported as bound, without asking the host.
#[derive(Default)]
pub struct StaticPorts {
    pub bound: BTreeSet<u16>,
}

impl PortAllocator for StaticPorts {
    async fn allocate(&self, range: PortRange) -> Result<u16> {
        first_free_port(&self.bound, range)
    }
}

/// Succeeds unless an exit code is scripted for a command kind.
#[derive(Default)]
pub struct ScriptedDriver {
    pub calls: Mutex<Vec<(CommandKind, String)>>,
    pub exit_codes: Mutex<HashMap<CommandKind, i32>>,
}

impl ScriptedDriver {
    pub fn set_exit(&self, kind: CommandKind, code: i32) {
        self.exit_codes.lock().unwrap().insert(kind, code);
    }

    pub fn calls(&self) -> Vec<(CommandKind, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessDriver for ScriptedDriver {
    async fn run(&self, kind: CommandKind, target: &InstanceTarget<'_>) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((kind, target.name.to_string()));
        let code = self.exit_codes.lock().unwrap().get(&kind).copied().unwrap_or(0);
        Ok(CommandOutput::new(Some(code), format!("{kind:?} output")))
    }
}

pub type TestManager = InstanceManager<FsInstanceStore, StaticPorts, ScriptedDriver>;

pub fn test_manager(root: &TempDir, bound: &[u16]) -> TestManager {
    InstanceManager::new(
        FsInstanceStore::new(root.path()),
        StaticPorts {
            bound: bound.iter().copied().collect(),
        },
        ScriptedDriver::default(),
        PortRange::new(4200, 100),
    )
}
