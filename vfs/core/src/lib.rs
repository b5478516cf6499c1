//! Core of bridgevfs: the provider contract and everything between an
//! engine's file operations and a provider reached across a call boundary.
//!
//! * [`provider`]: the traits a storage provider implements.
//! * [`shim`]: guarded provider calls and the retained [`ProviderHandle`].
//! * [`seek`]: whence-relative seeking built from absolute positioning.
//! * [`write_buffer`]: the write-combining staging buffer.
//! * [`file`]: [`VfsFile`], the engine-agnostic file object.

pub mod error;
pub mod fault;
pub mod file;
pub mod flags;
pub mod provider;
pub mod seek;
pub mod shim;
pub mod write_buffer;

pub use error::{FileError, VfsError, VfsErrorKind, VfsResult, io_result, map_io_error};
pub use fault::{ProviderFault, last_error_message, take_last_error, update_last_error};
pub use file::VfsFile;
pub use flags::{AccessCheck, FileKind, OpenFlags, OpenOptions};
pub use provider::{ProviderIo, ProviderOp, VfsProvider};
pub use shim::ProviderHandle;
pub use write_buffer::{BlockSink, WriteBuffer};
