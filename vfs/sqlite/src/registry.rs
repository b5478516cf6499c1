//! Registration of VFS descriptors with SQLite.
//!
//! Descriptors are leaked: SQLite keeps raw pointers to them for as long as
//! any connection uses the VFS, which may outlive `unregister`.

use crate::config::{VfsConfig, normalize_vfs_name};
use crate::vfs_methods::{VfsAppData, descriptor};
use bridgevfs_core::{VfsError, VfsErrorKind, VfsProvider};
use libsqlite3_sys as ffi;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::c_int;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("invalid vfs config")]
    Config(#[source] VfsError),
    #[error("a vfs named {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("no vfs named {0:?} is registered")]
    NotRegistered(String),
    #[error("sqlite3_vfs_{op} failed with code {code}")]
    Sqlite { op: &'static str, code: c_int },
}

impl RegisterError {
    pub fn kind(&self) -> VfsErrorKind {
        match self {
            RegisterError::Config(err) => err.kind(),
            RegisterError::AlreadyRegistered(_) => VfsErrorKind::AlreadyExists,
            RegisterError::NotRegistered(_) => VfsErrorKind::NotFound,
            RegisterError::Sqlite { .. } => VfsErrorKind::Internal,
        }
    }
}

struct VfsPtr(*mut ffi::sqlite3_vfs);

// The descriptor is never mutated after registration and never freed.
unsafe impl Send for VfsPtr {}
unsafe impl Sync for VfsPtr {}

static REGISTRY: Lazy<RwLock<HashMap<String, VfsPtr>>> = Lazy::new(Default::default);

/// Register `provider` with SQLite under `config.name`.
///
/// Returns the normalized name connections must pass to `sqlite3_open_v2`.
pub fn register(
    config: VfsConfig,
    provider: Arc<dyn VfsProvider>,
) -> Result<String, RegisterError> {
    config.validate().map_err(RegisterError::Config)?;
    let name = normalize_vfs_name(&config.name).map_err(RegisterError::Config)?;
    let c_name = CString::new(name.clone()).map_err(|_| {
        RegisterError::Config(VfsError::new(
            VfsErrorKind::InvalidInput,
            "vfs_config.name.nul",
        ))
    })?;
    let max_pathname = c_int::try_from(config.max_pathname).map_err(|_| {
        RegisterError::Config(VfsError::new(
            VfsErrorKind::InvalidInput,
            "vfs_config.max_pathname",
        ))
    })?;

    let mut registry = REGISTRY.write();
    let existing = unsafe { ffi::sqlite3_vfs_find(c_name.as_ptr()) };
    if registry.contains_key(&name) || !existing.is_null() {
        return Err(RegisterError::AlreadyRegistered(name));
    }

    let make_default = c_int::from(config.make_default);
    let provider_name = provider.name().to_string();
    let app = Box::into_raw(Box::new(VfsAppData { config, provider }));
    let z_name = c_name.into_raw();
    let vfs = Box::into_raw(Box::new(descriptor(z_name, app, max_pathname)));

    let rc = unsafe { ffi::sqlite3_vfs_register(vfs, make_default) };
    if rc != ffi::SQLITE_OK {
        // SQLite did not keep the descriptor, so it is still ours to free.
        unsafe {
            drop(Box::from_raw(vfs));
            drop(Box::from_raw(app));
            drop(CString::from_raw(z_name));
        }
        return Err(RegisterError::Sqlite {
            op: "register",
            code: rc,
        });
    }

    registry.insert(name.clone(), VfsPtr(vfs));
    tracing::info!(vfs = %name, provider = %provider_name, "vfs registered");
    Ok(name)
}

/// Remove a VFS from SQLite's list. Connections already using it keep
/// working.
pub fn unregister(name: &str) -> Result<(), RegisterError> {
    let name = normalize_vfs_name(name).map_err(RegisterError::Config)?;
    let mut registry = REGISTRY.write();
    let Some(vfs) = registry.get(&name) else {
        return Err(RegisterError::NotRegistered(name));
    };
    let rc = unsafe { ffi::sqlite3_vfs_unregister(vfs.0) };
    if rc != ffi::SQLITE_OK {
        return Err(RegisterError::Sqlite {
            op: "unregister",
            code: rc,
        });
    }
    registry.remove(&name);
    tracing::info!(vfs = %name, "vfs unregistered");
    Ok(())
}

pub fn is_registered(name: &str) -> bool {
    match normalize_vfs_name(name) {
        Ok(name) => REGISTRY.read().contains_key(&name),
        Err(_) => false,
    }
}

/// Names registered through this crate, sorted.
pub fn registered_names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY.read().keys().cloned().collect();
    names.sort();
    names
}
