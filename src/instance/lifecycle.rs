//! Instance lifecycle management (restart/purge).

use super::lock::RootLock;
use super::manager::InstanceManager;
use super::store::InstanceStore;
use super::types::{InstanceRecord, NewInstance, Outcome};
use crate::error::{AppError, Result};
use crate::process::{CommandKind, PortAllocator, ProcessDriver};
use crate::validation::validate_name;

impl<S, P, D> InstanceManager<S, P, D>
where
    S: InstanceStore,
    P: PortAllocator,
    D: ProcessDriver,
{
    /// Restart an instance. Also starts one that was not running.
    /// The stored record is never touched.
    pub async fn restart(&self, name: &str) -> Result<Outcome> {
        validate_name(name)?;
        if !self.store.exists(name)? {
            return Err(AppError::not_found(name));
        }

        self.run_checked(CommandKind::Restart, name).await?;
        log::info!("Instance {} restarted", name);

        Ok(Outcome::ok())
    }

    /// Destroy and recreate an instance with the same identity, password
    /// included.
    ///
    /// The stored fields are checked against the current configuration
    /// first, so a record that could not be recreated is left alone.
    /// Otherwise not atomic: if the delete fails nothing is recreated, and
    /// if the create fails the instance stays gone. The root lock keeps a
    /// concurrent `create_for_user` from taking the freed port in between.
    pub async fn purge(&self, name: &str) -> Result<InstanceRecord> {
        let new = NewInstance::from(self.read(name)?);
        self.validate_new(&new)?;
        let _lock = RootLock::acquire(self.store.root()).await?;
        log::info!("Purging instance {}", name);

        self.delete(name).await?;
        let recreated = self.create(new).await.inspect_err(|e| {
            log::error!("Instance {} deleted but not recreated: {}", name, e);
        })?;

        Ok(recreated)
    }
}
