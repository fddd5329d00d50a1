use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::unistd::{access, AccessFlags};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Placeholder that must be overridden before the service can start.
const REQUIRED_PLACEHOLDER: &str = "REQUIRED";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Advertised host written into every instance; falls back to the hostname.
    #[serde(default)]
    pub host: Option<String>,
    pub ldap: LdapConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Instance root; one directory per instance lives under it.
    pub path: PathBuf,
    pub ports: PortRange,
}

/// Half-open port range `[start, start + max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub max: u16,
}

impl PortRange {
    pub fn new(start: u16, max: u16) -> Self {
        Self { start, max }
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> u32 {
        u32::from(self.start) + u32::from(self.max)
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && u32::from(port) < self.end()
    }

    pub fn ports(&self) -> impl Iterator<Item = u16> {
        let end = self.end();
        (self.start..=u16::MAX).take_while(move |port| u32::from(*port) < end)
    }

    fn validate(&self) -> Result<()> {
        if self.start == 0 || self.max == 0 {
            return Err(AppError::config(
                "ldap.ports.start and ldap.ports.max must be positive",
            ));
        }
        if self.end() - 1 > u32::from(u16::MAX) {
            return Err(AppError::config(format!(
                "Port range {self} exceeds {}",
                u16::MAX
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_setup")]
    pub setup: String,
    #[serde(default = "default_stop")]
    pub stop: String,
    #[serde(default = "default_restart")]
    pub restart: String,
    #[serde(default = "default_netstat")]
    pub netstat: String,
    /// Zero disables the timeout.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl CommandsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            setup: default_setup(),
            stop: default_stop(),
            restart: default_restart(),
            netstat: default_netstat(),
            timeout_secs: 0,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_setup() -> String {
    "/usr/sbin/setup-ds.pl".to_string()
}

fn default_stop() -> String {
    "/usr/sbin/stop-dirsrv".to_string()
}

fn default_restart() -> String {
    "/usr/sbin/restart-dirsrv".to_string()
}

fn default_netstat() -> String {
    "netstat".to_string()
}

impl AppConfig {
    /// Load and validate the configuration file. Every failure here is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        if let Some(key) = find_placeholder(&table, "") {
            return Err(AppError::config(format!(
                "Must override config item \"{key}\""
            )));
        }
        let mut config: Self = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        self.ldap.ports.validate()?;

        let root = &self.ldap.path;
        if access(root.as_path(), AccessFlags::W_OK).is_err() || !root.is_dir() {
            return Err(AppError::config(
                "Not enough access to LDAP instance directory",
            )
            .with("path", root.display().to_string()));
        }
        self.ldap.path = root.canonicalize().map_err(|e| {
            AppError::config(format!("Failed to resolve {}: {}", root.display(), e))
        })?;

        if let Some(host) = &self.host {
            crate::validation::validate_host(host)
                .map_err(|_| AppError::config(format!("Invalid host \"{host}\"")))?;
        }
        Ok(())
    }

    pub fn instance_root(&self) -> &Path {
        &self.ldap.path
    }

    pub fn port_range(&self) -> PortRange {
        self.ldap.ports
    }

    /// The configured host, or this machine's hostname.
    pub fn resolve_host(&self) -> Result<String> {
        if let Some(host) = &self.host {
            return Ok(host.clone());
        }
        let hostname = nix::unistd::gethostname()
            .map_err(|e| AppError::config(format!("Failed to get hostname: {e}")))?;
        hostname
            .into_string()
            .map_err(|_| AppError::config("Hostname is not valid UTF-8"))
    }
}

/// Dotted key of the first value still set to the placeholder.
fn find_placeholder(table: &toml::Table, prefix: &str) -> Option<String> {
    table.iter().find_map(|(key, value)| {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::String(s) if s == REQUIRED_PLACEHOLDER => Some(path),
            toml::Value::Table(inner) => find_placeholder(inner, &path),
            _ => None,
        }
    })
}
