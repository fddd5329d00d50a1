//! Instance management for directory-server instances.
//!
//! Layout under the instance root:
//! - {name}/details.json - the persisted instance record
//! - {name}/install.inf - install file consumed by the setup tool
//! - {name}/... - server configuration, data and logs written by the tools
//! - .lock - advisory lock held while creating instances

mod crud;
mod install;
mod lifecycle;
mod lock;
mod manager;
mod store;
mod types;


// Re-export types
pub use types::{InstanceRecord, NewInstance, Outcome};

// Re-export the manager and its store
pub use manager::{InstanceManager, SystemInstanceManager};
pub use store::{FsInstanceStore, InstanceStore};

pub use crud::generate_password;
pub use install::render_install_inf;
pub use lock::RootLock;
