//! LDAP as a service: per-user directory-server instances on one host.
//!
//! Each instance is a 389 Directory Server with its own port and a private
//! directory under the configured instance root.

pub mod commands;
pub mod config;
pub mod error;
pub mod instance;
pub mod paths;
pub mod process;
pub mod validation;

pub use commands::{dispatch, error_response, Operation, RequestContext};
pub use config::{AppConfig, PortRange};
pub use error::{AppError, ErrorKind, Result};
pub use instance::{InstanceManager, InstanceRecord, SystemInstanceManager};
