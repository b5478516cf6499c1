//! Error types shared by providers, the call shim and the file object.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use thiserror::Error;

pub type VfsResult<T> = Result<T, VfsError>;

/// Classification of a provider or shim failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum VfsErrorKind {
    NotFound,
    AlreadyExists,
    PermissionDenied,
    InvalidInput,
    NotSupported,
    ReadOnlyFs,
    NoMemory,
    UnexpectedEof,
    /// The handle was already closed.
    BadHandle,
    /// A positioning call reported success but the confirmed position differs.
    PositionMismatch,
    /// The provider faulted (panicked) instead of returning an error.
    Fault,
    Internal,
    Io,
}

impl VfsErrorKind {
    /// Stable string name (logging only).
    pub fn as_str(self) -> &'static str {
        match self {
            VfsErrorKind::NotFound => "not_found",
            VfsErrorKind::AlreadyExists => "already_exists",
            VfsErrorKind::PermissionDenied => "permission_denied",
            VfsErrorKind::InvalidInput => "invalid_input",
            VfsErrorKind::NotSupported => "not_supported",
            VfsErrorKind::ReadOnlyFs => "read_only_fs",
            VfsErrorKind::NoMemory => "no_memory",
            VfsErrorKind::UnexpectedEof => "unexpected_eof",
            VfsErrorKind::BadHandle => "bad_handle",
            VfsErrorKind::PositionMismatch => "position_mismatch",
            VfsErrorKind::Fault => "fault",
            VfsErrorKind::Internal => "internal",
            VfsErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for VfsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every provider and shim call.
///
/// `context` is a static dotted label naming the call site
/// (`"mem.io.read"`, `"shim.seek.confirm"`, ...).
#[derive(Debug, Error)]
#[error("{context}: {kind}")]
pub struct VfsError {
    kind: VfsErrorKind,
    context: &'static str,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl VfsError {
    pub fn new(kind: VfsErrorKind, context: &'static str) -> Self {
        Self {
            kind,
            context,
            source: None,
        }
    }

    pub fn with_source<E>(kind: VfsErrorKind, context: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self {
            kind,
            context,
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> VfsErrorKind {
        self.kind
    }

    pub fn context(&self) -> &'static str {
        self.context
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == VfsErrorKind::NotFound
    }
}

/// Translate an I/O error into a [`VfsError`].
///
/// This is the only place `io::ErrorKind` is mapped; providers backed by
/// `std::io` should go through it.
pub fn map_io_error(context: &'static str, err: io::Error) -> VfsError {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => VfsErrorKind::NotFound,
        io::ErrorKind::AlreadyExists => VfsErrorKind::AlreadyExists,
        io::ErrorKind::PermissionDenied => VfsErrorKind::PermissionDenied,
        io::ErrorKind::InvalidInput => VfsErrorKind::InvalidInput,
        io::ErrorKind::Unsupported => VfsErrorKind::NotSupported,
        io::ErrorKind::UnexpectedEof => VfsErrorKind::UnexpectedEof,
        io::ErrorKind::OutOfMemory => VfsErrorKind::NoMemory,
        _ => VfsErrorKind::Io,
    };
    VfsError::with_source(kind, context, err)
}

pub fn io_result<T>(context: &'static str, result: io::Result<T>) -> VfsResult<T> {
    result.map_err(|err| map_io_error(context, err))
}

/// Failure of a file-object operation, classified the way the engine
/// reports it.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("no path given")]
    MissingPath,
    #[error("cannot open {path}")]
    CantOpen {
        path: String,
        #[source]
        source: VfsError,
    },
    #[error("cannot allocate a {capacity} byte write buffer")]
    NoMemory { capacity: usize },
    #[error("short read: {read} of {requested} bytes")]
    ShortRead { read: usize, requested: usize },
    #[error("read failed")]
    Read(#[source] VfsError),
    #[error("write failed")]
    Write(#[source] VfsError),
    #[error("truncate failed")]
    Truncate(#[source] VfsError),
    #[error("sync failed")]
    Fsync(#[source] VfsError),
    #[error("size query failed")]
    Fstat(#[source] VfsError),
    #[error("delete failed")]
    Delete(#[source] VfsError),
    #[error("directory sync is not supported")]
    DirSyncUnsupported,
}

impl FileError {
    /// The underlying provider error, if there is one.
    pub fn vfs_error(&self) -> Option<&VfsError> {
        match self {
            FileError::CantOpen { source, .. } => Some(source),
            FileError::Read(err)
            | FileError::Write(err)
            | FileError::Truncate(err)
            | FileError::Fsync(err)
            | FileError::Fstat(err)
            | FileError::Delete(err) => Some(err),
            _ => None,
        }
    }
}
