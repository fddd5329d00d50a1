//! Durable storage of instance records under the instance root.

use std::fs::{self, DirBuilder};
use std::io::{self, Write as _};
use std::os::unix::fs::DirBuilderExt as _;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use super::types::InstanceRecord;
use crate::error::{AppError, Result};
use crate::paths::{get_instance_dir, get_record_path, RECORD_FILE};
use crate::validation::{is_token, validate_filter, validate_name};

/// Record persistence keyed by instance name.
///
/// Every method validates its name or filter before touching storage, so a
/// key can never escape the instance root.
pub trait InstanceStore: Send + Sync {
    /// Instance root directory.
    fn root(&self) -> &Path;

    /// Whether the instance's storage area exists, with or without a record.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Create the storage area; fails with `AlreadyExists` if present.
    fn create_area(&self, name: &str) -> Result<PathBuf>;

    /// Atomically write an auxiliary file into the storage area.
    fn write_artifact(&self, name: &str, file_name: &str, contents: &str) -> Result<PathBuf>;

    /// Persist a new record; fails with `AlreadyExists` if one is stored.
    fn put(&self, name: &str, record: &InstanceRecord) -> Result<()>;

    fn get(&self, name: &str) -> Result<InstanceRecord>;

    /// Delete the record and its whole storage area.
    fn remove(&self, name: &str) -> Result<()>;

    /// Sorted names of stored records starting with `filter`; empty matches all.
    fn list(&self, filter: &str) -> Result<Vec<String>>;

    fn instance_dir(&self, name: &str) -> PathBuf {
        get_instance_dir(self.root(), name)
    }
}

/// One directory per instance, each holding a JSON record file.
#[derive(Debug, Clone)]
pub struct FsInstanceStore {
    root: PathBuf,
}

impl FsInstanceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl InstanceStore for FsInstanceStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        Ok(self.instance_dir(name).is_dir())
    }

    fn create_area(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        let dir = self.instance_dir(name);
        DirBuilder::new()
            .mode(0o700)
            .create(&dir)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => AppError::already_exists(name),
                _ => AppError::storage(format!("Could not create folder for '{name}'"))
                    .with("detail", e.to_string()),
            })?;
        Ok(dir)
    }

    fn write_artifact(&self, name: &str, file_name: &str, contents: &str) -> Result<PathBuf> {
        validate_name(name)?;
        let target = self.instance_dir(name).join(file_name);
        write_private(&target, contents.as_bytes(), true).map_err(|e| {
            AppError::storage(format!("Could not create {file_name} for '{name}'"))
                .with("detail", e.to_string())
        })?;
        Ok(target)
    }

    fn put(&self, name: &str, record: &InstanceRecord) -> Result<()> {
        validate_name(name)?;
        if record.name != name {
            return Err(AppError::invalid_input(format!(
                "Record for '{}' stored under '{name}'",
                record.name
            )));
        }
        let dir = self.instance_dir(name);
        if !dir.is_dir() {
            return Err(AppError::not_found(name));
        }
        let content = serde_json::to_vec_pretty(record)
            .map_err(|e| AppError::internal(format!("Failed to encode '{name}': {e}")))?;
        write_private(&get_record_path(&dir), &content, false).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => AppError::already_exists(name),
            _ => AppError::storage(format!("Could not store details for '{name}'"))
                .with("detail", e.to_string()),
        })
    }

    fn get(&self, name: &str) -> Result<InstanceRecord> {
        validate_name(name)?;
        let dir = self.instance_dir(name);
        if !dir.is_dir() {
            return Err(AppError::not_found(name));
        }
        let content = match fs::read(get_record_path(&dir)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AppError::not_found(name).with("detail", "record missing"));
            }
            Err(e) => {
                return Err(AppError::storage(format!("Could not read '{name}'"))
                    .with("detail", e.to_string()));
            }
        };
        let record: InstanceRecord =
            serde_json::from_slice(&content).map_err(|e| AppError::corrupt(name, e.to_string()))?;
        if record.name != name {
            return Err(AppError::corrupt(
                name,
                format!("record names '{}'", record.name),
            ));
        }
        Ok(record)
    }

    fn remove(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let dir = self.instance_dir(name);
        if !dir.is_dir() {
            return Err(AppError::not_found(name));
        }
        fs::remove_dir_all(&dir).map_err(|e| {
            AppError::storage(format!("Could not remove instance '{name}'"))
                .with("detail", e.to_string())
        })
    }

    fn list(&self, filter: &str) -> Result<Vec<String>> {
        validate_filter(filter)?;
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            // Areas without a record are mid-create or failed-create remnants.
            if is_token(name) && name.starts_with(filter) && entry.path().join(RECORD_FILE).is_file()
            {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

/// Write through a temp file in the same directory so readers never see a
/// partial file. Temp files are created 0600.
fn write_private(target: &Path, contents: &[u8], overwrite: bool) -> io::Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    let persisted = if overwrite {
        temp.persist(target)
    } else {
        temp.persist_noclobber(target)
    };
    persisted.map(|_| ()).map_err(|e| e.error)
}
