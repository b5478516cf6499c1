//! SQLite VFS backed by a bridgevfs provider.
//!
//! Register a provider once, then open connections with the returned name:
//!
//! ```no_run
//! use std::sync::Arc;
//! use bridgevfs_mem::MemProvider;
//! use bridgevfs_sqlite::{VfsConfig, register};
//!
//! let name = register(VfsConfig::named("memvfs"), Arc::new(MemProvider::default()))?;
//! // sqlite3_open_v2("/app.db", ..., name) now goes through MemProvider.
//! # Ok::<(), bridgevfs_sqlite::RegisterError>(())
//! ```
//!
//! Locking is not provided: every lock request succeeds. Shared memory,
//! memory mapping and extension loading are not supported.

pub mod codes;
mod config;
mod io_methods;
pub mod path;
mod registry;
pub mod time;
mod vfs_methods;

pub use config::VfsConfig;
pub use registry::{RegisterError, is_registered, register, registered_names, unregister};
