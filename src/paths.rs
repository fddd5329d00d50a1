//! Centralized path utilities for the application.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Persisted instance record, readable for the lifetime of the instance.
pub const RECORD_FILE: &str = "details.json";

/// Install configuration consumed once by the setup tool.
pub const INSTALL_FILE: &str = "install.inf";

/// Log written by the setup tool.
pub const SETUP_LOG_FILE: &str = "setup.log";

/// Advisory lock file in the instance root.
pub const LOCK_FILE: &str = ".lock";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "LDAPAAS_CONFIG";

/// Get the root data directory for the application (~/.ldapaas).
pub fn get_data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| AppError::config("Cannot find home directory"))?;
    Ok(home.join(".ldapaas"))
}

/// Get the default path to the config file.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("config.toml"))
}

/// Get the directory of an instance under the instance root.
pub fn get_instance_dir(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

pub fn get_record_path(instance_dir: &Path) -> PathBuf {
    instance_dir.join(RECORD_FILE)
}

pub fn get_install_path(instance_dir: &Path) -> PathBuf {
    instance_dir.join(INSTALL_FILE)
}

pub fn get_setup_log_path(instance_dir: &Path) -> PathBuf {
    instance_dir.join(SETUP_LOG_FILE)
}
