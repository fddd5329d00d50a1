//! Instance CRUD operations.

use std::collections::BTreeMap;

use super::install::render_install_inf;
use super::lock::RootLock;
use super::manager::InstanceManager;
use super::store::InstanceStore;
use super::types::{InstanceRecord, NewInstance, Outcome};
use crate::error::{AppError, Result};
use crate::paths::INSTALL_FILE;
use crate::process::{CommandKind, PortAllocator, ProcessDriver};
use crate::validation::{
    validate_base_dn, validate_filter, validate_host, validate_name, validate_password,
    validate_port, validate_user,
};

const PASSWORD_LEN: usize = 15;
const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random alphanumeric administrative password.
pub fn generate_password() -> String {
    let mut seed = v4_random_bits(uuid::Uuid::new_v4().as_u128());
    let base = PASSWORD_ALPHABET.len() as u128;
    (0..PASSWORD_LEN)
        .map(|_| {
            let idx = (seed % base) as usize;
            seed /= base;
            char::from(PASSWORD_ALPHABET[idx])
        })
        .collect()
}

/// Pack the 122 random bits of a v4 UUID into the low bits, dropping the
/// version nibble (bits 76..80) and the variant bits (62..64).
fn v4_random_bits(value: u128) -> u128 {
    let low = value & ((1 << 62) - 1);
    let mid = (value >> 64) & 0xfff;
    let high = value >> 80;
    low | (mid << 62) | (high << 74)
}

impl<S, P, D> InstanceManager<S, P, D>
where
    S: InstanceStore,
    P: PortAllocator,
    D: ProcessDriver,
{
    /// Create an instance: storage area, install file, record, then the
    /// setup tool.
    ///
    /// A failure after the storage area exists leaves it in place for the
    /// operator to inspect and clean up.
    pub async fn create(&self, new: NewInstance) -> Result<InstanceRecord> {
        self.validate_new(&new)?;
        let password = new.password.unwrap_or_else(generate_password);

        let record = InstanceRecord {
            name: new.name,
            user: new.user,
            host: new.host,
            port: new.port,
            base_dn: new.base_dn,
            password,
        };
        let name = record.name.as_str();

        let dir = self.store.create_area(name)?;
        self.store
            .write_artifact(name, INSTALL_FILE, &render_install_inf(&record, &dir))?;
        self.store.put(name, &record)?;

        log::info!("Installing instance {} on port {}", name, record.port);
        self.run_checked(CommandKind::Install, name).await?;
        log::info!("Instance {} created for {}", name, record.user);

        Ok(record)
    }

    /// Check every field of `new` against the current configuration.
    pub(super) fn validate_new(&self, new: &NewInstance) -> Result<()> {
        validate_name(&new.name)?;
        validate_user(&new.user)?;
        validate_host(&new.host)?;
        validate_port(new.port, self.range)?;
        validate_base_dn(&new.base_dn)?;
        if let Some(password) = &new.password {
            validate_password(password)?;
        }
        Ok(())
    }

    /// Create an instance named `<user><port>`, on `port` if given or else
    /// on the next free one.
    ///
    /// The root lock is held from allocation until the setup tool has bound
    /// the port, so concurrent creators cannot pick the same one.
    pub async fn create_for_user(
        &self,
        user: &str,
        host: &str,
        base_dn: &str,
        password: Option<String>,
        port: Option<u16>,
    ) -> Result<InstanceRecord> {
        validate_user(user)?;
        validate_host(host)?;
        validate_base_dn(base_dn)?;
        if let Some(password) = &password {
            validate_password(password)?;
        }
        if let Some(port) = port {
            validate_port(port, self.range)?;
        }

        let _lock = RootLock::acquire(self.store.root()).await?;
        let port = match port {
            Some(port) => port,
            None => self.allocate_port().await?,
        };
        let new = NewInstance {
            name: format!("{user}{port}"),
            user: user.to_string(),
            host: host.to_string(),
            port,
            base_dn: base_dn.to_string(),
            password,
        };
        self.create(new).await
    }

    /// Read an instance record. Ownership is the caller's concern.
    pub fn read(&self, name: &str) -> Result<InstanceRecord> {
        validate_name(name)?;
        self.store.get(name)
    }

    /// Stop the instance, then remove its storage area.
    ///
    /// If the stop fails nothing is removed.
    pub async fn delete(&self, name: &str) -> Result<Outcome> {
        validate_name(name)?;
        if !self.store.exists(name)? {
            return Err(AppError::not_found(name));
        }

        self.run_checked(CommandKind::Stop, name).await?;
        self.store.remove(name)?;
        log::info!("Instance {} deleted", name);

        Ok(Outcome::ok())
    }

    /// Read every instance whose name starts with `filter`.
    /// Fails on the first unreadable instance.
    pub fn read_many(&self, filter: &str) -> Result<BTreeMap<String, InstanceRecord>> {
        validate_filter(filter)?;
        self.store
            .list(filter)?
            .into_iter()
            .map(|name| {
                let record = self.read(&name)?;
                Ok((name, record))
            })
            .collect()
    }

    /// Delete every instance whose name starts with `filter`.
    /// Stops at the first failure; earlier deletions stay done.
    pub async fn delete_many(&self, filter: &str) -> Result<BTreeMap<String, Outcome>> {
        validate_filter(filter)?;
        let mut results = BTreeMap::new();
        for name in self.store.list(filter)? {
            let outcome = self.delete(&name).await?;
            results.insert(name, outcome);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_seed_skips_fixed_uuid_bits() {
        let version_and_variant: u128 = (0xf << 76) | (0x3 << 62);
        assert_eq!(v4_random_bits(version_and_variant), 0);
        assert_eq!(v4_random_bits(!version_and_variant), (1 << 122) - 1);
        assert_eq!(v4_random_bits(u128::MAX), (1 << 122) - 1);
    }

    #[test]
    fn passwords_are_alphanumeric() {
        let password = generate_password();
        assert_eq!(password.len(), PASSWORD_LEN);
        assert!(password.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));
    }
}
