//! Instance-related type definitions.

use serde::{Deserialize, Serialize};

/// Persisted identity of one directory-server instance.
///
/// Fields are set once at creation; a purge recreates the instance with the
/// same values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceRecord {
    pub name: String,
    pub user: String,
    pub host: String,
    pub port: u16,
    pub base_dn: String,
    /// Stored in plaintext next to the other fields.
    pub password: String,
}

/// Parameters for a new instance. A missing password is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInstance {
    pub name: String,
    pub user: String,
    pub host: String,
    pub port: u16,
    pub base_dn: String,
    pub password: Option<String>,
}

impl NewInstance {
    pub fn new(name: &str, user: &str, host: &str, port: u16, base_dn: &str) -> Self {
        Self {
            name: name.to_string(),
            user: user.to_string(),
            host: host.to_string(),
            port,
            base_dn: base_dn.to_string(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl From<InstanceRecord> for NewInstance {
    fn from(record: InstanceRecord) -> Self {
        Self {
            name: record.name,
            user: record.user,
            host: record.host,
            port: record.port,
            base_dn: record.base_dn,
            password: Some(record.password),
        }
    }
}

/// Success marker returned by operations with no other result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
}

impl Outcome {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
