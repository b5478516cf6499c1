//! The provider contract.
//!
//! A provider owns the actual bytes. It is reached only through these two
//! traits; every call is synchronous and may fail. Providers report ordinary
//! failures through [`VfsResult`]. A panic inside a provider is treated as a
//! fault and is caught by the call shim, so it never reaches the engine.

use crate::flags::{AccessCheck, OpenOptions};
use crate::{VfsError, VfsErrorKind, VfsResult};
use std::fmt;

/// Filesystem-level provider entry points.
pub trait VfsProvider: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn open(&self, path: &str, opts: &OpenOptions) -> VfsResult<Box<dyn ProviderIo>>;

    fn delete(&self, path: &str) -> VfsResult<()>;

    fn access(&self, path: &str, check: AccessCheck) -> VfsResult<bool>;
}

/// An open provider object. It carries its own position.
pub trait ProviderIo: Send + 'static {
    /// Read at the current position, advancing it. `Ok(0)` means end of file.
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize>;

    /// Write all of `buf` at the current position, advancing it.
    fn write(&mut self, buf: &[u8]) -> VfsResult<()>;

    /// Persist everything written so far.
    fn flush(&mut self) -> VfsResult<()>;

    fn close(&mut self) -> VfsResult<()>;

    fn position(&mut self) -> VfsResult<u64>;

    fn set_position(&mut self, position: u64) -> VfsResult<()>;

    fn length(&mut self) -> VfsResult<u64>;

    fn truncate(&mut self, _len: u64) -> VfsResult<()> {
        Err(VfsError::new(
            VfsErrorKind::NotSupported,
            "provider_io.truncate",
        ))
    }

    /// Positioned read. The current position is restored afterwards.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        let saved = self.position()?;
        self.set_position(offset)?;
        let mut filled = 0;
        let result = loop {
            if filled == buf.len() {
                break Ok(filled);
            }
            match self.read(&mut buf[filled..]) {
                Ok(0) => break Ok(filled),
                Ok(n) => filled += n,
                Err(err) => break Err(err),
            }
        };
        self.set_position(saved)?;
        result
    }

    /// Positioned write. The current position is restored afterwards.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> VfsResult<usize> {
        let saved = self.position()?;
        self.set_position(offset)?;
        let result = self.write(buf).map(|()| buf.len());
        self.set_position(saved)?;
        result
    }
}

/// Names of the provider entry points the shim calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    Open,
    Delete,
    Access,
    Read,
    Write,
    ReadAt,
    WriteAt,
    Flush,
    Close,
    SetPosition,
    Position,
    Length,
    Truncate,
}

impl ProviderOp {
    pub const ALL: [ProviderOp; 13] = [
        ProviderOp::Open,
        ProviderOp::Delete,
        ProviderOp::Access,
        ProviderOp::Read,
        ProviderOp::Write,
        ProviderOp::ReadAt,
        ProviderOp::WriteAt,
        ProviderOp::Flush,
        ProviderOp::Close,
        ProviderOp::SetPosition,
        ProviderOp::Position,
        ProviderOp::Length,
        ProviderOp::Truncate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProviderOp::Open => "open",
            ProviderOp::Delete => "delete",
            ProviderOp::Access => "access",
            ProviderOp::Read => "read",
            ProviderOp::Write => "write",
            ProviderOp::ReadAt => "read_at",
            ProviderOp::WriteAt => "write_at",
            ProviderOp::Flush => "flush",
            ProviderOp::Close => "close",
            ProviderOp::SetPosition => "set_position",
            ProviderOp::Position => "position",
            ProviderOp::Length => "length",
            ProviderOp::Truncate => "truncate",
        }
    }

    /// Error context used when the shim converts a fault from this call.
    pub fn fault_context(self) -> &'static str {
        match self {
            ProviderOp::Open => "shim.open.fault",
            ProviderOp::Delete => "shim.delete.fault",
            ProviderOp::Access => "shim.access.fault",
            ProviderOp::Read => "shim.read.fault",
            ProviderOp::Write => "shim.write.fault",
            ProviderOp::ReadAt => "shim.read_at.fault",
            ProviderOp::WriteAt => "shim.write_at.fault",
            ProviderOp::Flush => "shim.flush.fault",
            ProviderOp::Close => "shim.close.fault",
            ProviderOp::SetPosition => "shim.set_position.fault",
            ProviderOp::Position => "shim.position.fault",
            ProviderOp::Length => "shim.length.fault",
            ProviderOp::Truncate => "shim.truncate.fault",
        }
    }
}

impl fmt::Display for ProviderOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
