//! Per-user operations on top of the instance manager.
//!
//! Resolves a user and an [`Operation`] into manager calls, enforces
//! ownership and turns results and errors into JSON bodies.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::instance::{InstanceManager, InstanceRecord, InstanceStore, Outcome};
use crate::process::{PortAllocator, ProcessDriver};
use crate::validation::{is_token, parse_port};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// New instance named `<user><port>`, on the next free port unless one
    /// is given.
    Create {
        base_dn: String,
        password: Option<String>,
        port: Option<String>,
    },
    Read {
        name: String,
    },
    Delete {
        name: String,
    },
    Restart {
        name: String,
    },
    Purge {
        name: String,
    },
    /// All instances owned by the user.
    Index,
    /// Delete all instances owned by the user.
    Reset,
}

/// Validated requester plus the host new instances advertise.
#[derive(Debug, Clone)]
pub struct RequestContext {
    user: String,
    host: String,
}

impl RequestContext {
    /// A missing or malformed user is forbidden outright.
    pub fn new(user: Option<&str>, host: impl Into<String>) -> Result<Self> {
        match user {
            Some(user) if is_token(user) => Ok(Self {
                user: user.to_string(),
                host: host.into(),
            }),
            _ => Err(AppError::invalid_user()),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

/// Run `operation` for the requesting user and return the response body.
pub async fn dispatch<S, P, D>(
    manager: &InstanceManager<S, P, D>,
    ctx: &RequestContext,
    operation: Operation,
) -> Result<Value>
where
    S: InstanceStore,
    P: PortAllocator,
    D: ProcessDriver,
{
    log::info!("{} requested {}", ctx.user, operation_label(&operation));

    match operation {
        Operation::Create {
            base_dn,
            password,
            port,
        } => {
            let port = port.as_deref().map(parse_port).transpose()?;
            let record = manager
                .create_for_user(&ctx.user, &ctx.host, &base_dn, password, port)
                .await?;
            to_body(&record)
        }
        Operation::Read { name } => to_body(&owned(manager, ctx, &name)?),
        Operation::Delete { name } => {
            owned(manager, ctx, &name)?;
            to_body(&manager.delete(&name).await?)
        }
        Operation::Restart { name } => {
            owned(manager, ctx, &name)?;
            to_body(&manager.restart(&name).await?)
        }
        Operation::Purge { name } => {
            owned(manager, ctx, &name)?;
            to_body(&manager.purge(&name).await?)
        }
        Operation::Index => to_body(&owned_records(manager, ctx)?),
        Operation::Reset => {
            let mut results: BTreeMap<String, Outcome> = BTreeMap::new();
            for name in owned_records(manager, ctx)?.into_keys() {
                let outcome = manager.delete(&name).await?;
                results.insert(name, outcome);
            }
            to_body(&results)
        }
    }
}

/// Status code and body for a failed operation. The detail payload is
/// logged here and kept out of the body.
pub fn error_response(err: &AppError) -> (u16, Value) {
    if err.status_code() >= 500 {
        log::error!("{}", err);
    } else {
        log::warn!("{}", err);
    }
    let code = err.status_code();
    (code, json!({ "code": code, "error": err.message() }))
}

fn owned<S, P, D>(
    manager: &InstanceManager<S, P, D>,
    ctx: &RequestContext,
    name: &str,
) -> Result<InstanceRecord>
where
    S: InstanceStore,
    P: PortAllocator,
    D: ProcessDriver,
{
    let record = manager.read(name)?;
    if record.user != ctx.user {
        return Err(AppError::forbidden().with("name", name).with("user", &ctx.user));
    }
    Ok(record)
}

/// The name filter is a prefix, so `bob` also matches `bobby4200`; keep only
/// records that really belong to the user.
fn owned_records<S, P, D>(
    manager: &InstanceManager<S, P, D>,
    ctx: &RequestContext,
) -> Result<BTreeMap<String, InstanceRecord>>
where
    S: InstanceStore,
    P: PortAllocator,
    D: ProcessDriver,
{
    let mut records = manager.read_many(&ctx.user)?;
    records.retain(|_, record| record.user == ctx.user);
    Ok(records)
}

fn to_body<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::internal(format!("Failed to encode response: {e}")))
}

fn operation_label(operation: &Operation) -> String {
    match operation {
        Operation::Create { base_dn, .. } => format!("create {base_dn}"),
        Operation::Read { name } => format!("read {name}"),
        Operation::Delete { name } => format!("delete {name}"),
        Operation::Restart { name } => format!("restart {name}"),
        Operation::Purge { name } => format!("purge {name}"),
        Operation::Index => "index".to_string(),
        Operation::Reset => "reset".to_string(),
    }
}
