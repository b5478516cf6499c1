//! Provider call shim.
//!
//! Every call into a provider goes through [`guarded`], so provider errors
//! and faults come back as [`VfsError`]s and never unwind into the engine.
//! [`ProviderHandle`] is the retained provider object of one open file: it is
//! closed exactly once, either through [`ProviderHandle::close`] or, on paths
//! that never reach close, when it is dropped.

use crate::fault::guarded;
use crate::flags::{AccessCheck, OpenOptions};
use crate::provider::{ProviderIo, ProviderOp, VfsProvider};
use crate::seek::{Positioned, seek_exact};
use crate::write_buffer::BlockSink;
use crate::{VfsError, VfsErrorKind, VfsResult};
use std::fmt;

pub struct ProviderHandle {
    path: String,
    io: Option<Box<dyn ProviderIo>>,
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("path", &self.path)
            .field("open", &self.io.is_some())
            .finish()
    }
}

impl ProviderHandle {
    /// Acquire a provider object for `path`.
    pub fn open(provider: &dyn VfsProvider, path: &str, opts: &OpenOptions) -> VfsResult<Self> {
        let (io, provider_name) = guarded(ProviderOp::Open, || {
            let io = provider.open(path, opts)?;
            Ok((io, provider.name().to_string()))
        })?;
        tracing::debug!(
            provider = %provider_name,
            path,
            kind = ?opts.kind,
            "provider handle acquired"
        );
        Ok(Self {
            path: path.to_string(),
            io: Some(io),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn io(&mut self, context: &'static str) -> VfsResult<&mut (dyn ProviderIo + 'static)> {
        match self.io.as_mut() {
            Some(io) => Ok(io.as_mut()),
            None => Err(VfsError::new(VfsErrorKind::BadHandle, context)),
        }
    }

    /// Positioned read; returns the number of bytes the provider produced.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        let io = self.io("shim.read_at")?;
        guarded(ProviderOp::ReadAt, || io.read_at(offset, buf))
    }

    /// Positioned write; returns the number of bytes the provider accepted.
    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> VfsResult<usize> {
        let io = self.io("shim.write_at")?;
        guarded(ProviderOp::WriteAt, || io.write_at(offset, buf))
    }

    /// Seek to `offset`, confirm it, then write all of `data` there.
    pub fn write_exact_at(&mut self, offset: u64, data: &[u8]) -> VfsResult<()> {
        seek_exact(self, offset, "shim.write.seek")?;
        let written = self.write_at(offset, data)?;
        if written != data.len() {
            tracing::debug!(offset, written, expected = data.len(), "short provider write");
            return Err(VfsError::new(VfsErrorKind::Io, "shim.write.count"));
        }
        Ok(())
    }

    pub fn flush(&mut self) -> VfsResult<()> {
        let io = self.io("shim.flush")?;
        guarded(ProviderOp::Flush, || io.flush())
    }

    pub fn truncate(&mut self, len: u64) -> VfsResult<()> {
        let io = self.io("shim.truncate")?;
        guarded(ProviderOp::Truncate, || io.truncate(len))
    }

    /// Release the provider object.
    pub fn close(mut self) -> VfsResult<()> {
        self.release()
    }

    fn release(&mut self) -> VfsResult<()> {
        match self.io.take() {
            Some(mut io) => {
                let result = guarded(ProviderOp::Close, || io.close());
                tracing::debug!(path = %self.path, ok = result.is_ok(), "provider handle released");
                result
            }
            None => Ok(()),
        }
    }
}

impl Positioned for ProviderHandle {
    fn position(&mut self) -> VfsResult<u64> {
        let io = self.io("shim.position")?;
        guarded(ProviderOp::Position, || io.position())
    }

    fn set_position(&mut self, position: u64) -> VfsResult<()> {
        let io = self.io("shim.set_position")?;
        guarded(ProviderOp::SetPosition, || io.set_position(position))
    }

    fn length(&mut self) -> VfsResult<u64> {
        let io = self.io("shim.length")?;
        guarded(ProviderOp::Length, || io.length())
    }
}

impl BlockSink for ProviderHandle {
    fn write_block(&mut self, offset: u64, data: &[u8]) -> VfsResult<()> {
        self.write_exact_at(offset, data)
    }
}

impl Drop for ProviderHandle {
    fn drop(&mut self) {
        if self.io.is_some() {
            tracing::warn!(path = %self.path, "provider handle dropped without close");
            if let Err(err) = self.release() {
                tracing::warn!(
                    path = %self.path,
                    error = %err,
                    "closing dropped provider handle failed"
                );
            }
        }
    }
}

/// Ask the provider to delete `path`.
pub fn delete(provider: &dyn VfsProvider, path: &str) -> VfsResult<()> {
    guarded(ProviderOp::Delete, || provider.delete(path))
}

/// Ask the provider whether `path` passes `check`.
pub fn access(provider: &dyn VfsProvider, path: &str, check: AccessCheck) -> VfsResult<bool> {
    guarded(ProviderOp::Access, || provider.access(path, check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{FileKind, OpenFlags};

    struct NullIo;

    impl ProviderIo for NullIo {
        fn read(&mut self, _buf: &mut [u8]) -> VfsResult<usize> {
            Ok(0)
        }
        fn write(&mut self, _buf: &[u8]) -> VfsResult<()> {
            Ok(())
        }
        fn flush(&mut self) -> VfsResult<()> {
            Ok(())
        }
        fn close(&mut self) -> VfsResult<()> {
            Ok(())
        }
        fn position(&mut self) -> VfsResult<u64> {
            Ok(0)
        }
        fn set_position(&mut self, _position: u64) -> VfsResult<()> {
            Ok(())
        }
        fn length(&mut self) -> VfsResult<u64> {
            Ok(0)
        }
    }

    struct NamelessProvider;

    impl VfsProvider for NamelessProvider {
        fn name(&self) -> &str {
            panic!("no name")
        }
        fn open(&self, _path: &str, _opts: &OpenOptions) -> VfsResult<Box<dyn ProviderIo>> {
            Ok(Box::new(NullIo))
        }
        fn delete(&self, _path: &str) -> VfsResult<()> {
            Ok(())
        }
        fn access(&self, _path: &str, _check: AccessCheck) -> VfsResult<bool> {
            Ok(true)
        }
    }

    #[test]
    fn panicking_provider_name_is_a_fault() {
        let opts = OpenOptions::new(OpenFlags::READ | OpenFlags::WRITE, FileKind::MainDb);
        let err = ProviderHandle::open(&NamelessProvider, "/a.db", &opts).unwrap_err();
        assert_eq!(err.kind(), VfsErrorKind::Fault);
        assert_eq!(err.context(), ProviderOp::Open.fault_context());
    }
}
