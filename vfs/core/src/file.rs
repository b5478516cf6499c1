//! Engine-agnostic file object.
//!
//! [`VfsFile`] is what an engine adapter hands out for every opened file: a
//! retained provider handle plus, for main-journal files, a write-combining
//! buffer. Reads, syncs, size queries and truncation flush the buffer first,
//! so the provider always observes the same bytes an unbuffered writer would
//! have produced.

use crate::error::FileError;
use crate::flags::{AccessCheck, OpenOptions};
use crate::provider::VfsProvider;
use crate::seek::{Positioned, seek_exact};
use crate::shim::{self, ProviderHandle};
use crate::write_buffer::WriteBuffer;

#[derive(Debug)]
pub struct VfsFile {
    handle: ProviderHandle,
    buffer: Option<WriteBuffer>,
}

impl VfsFile {
    /// Open `path` through `provider`. A write buffer of `buffer_capacity`
    /// bytes is allocated when the file kind asks for one.
    pub fn open(
        provider: &dyn VfsProvider,
        path: &str,
        opts: &OpenOptions,
        buffer_capacity: usize,
    ) -> Result<Self, FileError> {
        let buffer = if opts.kind.wants_write_buffer() && buffer_capacity > 0 {
            let buffer = WriteBuffer::with_capacity(buffer_capacity).map_err(|err| {
                tracing::warn!(
                    path,
                    capacity = buffer_capacity,
                    error = %err,
                    "write buffer allocation failed"
                );
                FileError::NoMemory {
                    capacity: buffer_capacity,
                }
            })?;
            Some(buffer)
        } else {
            None
        };

        let handle = ProviderHandle::open(provider, path, opts).map_err(|source| {
            FileError::CantOpen {
                path: path.to_string(),
                source,
            }
        })?;

        Ok(Self { handle, buffer })
    }

    pub fn path(&self) -> &str {
        self.handle.path()
    }

    pub fn write_buffer(&self) -> Option<&WriteBuffer> {
        self.buffer.as_ref()
    }

    /// Write staged bytes to the provider.
    pub fn flush_buffer(&mut self) -> Result<(), FileError> {
        match self.buffer.as_mut() {
            Some(buffer) => buffer.flush(&mut self.handle).map_err(FileError::Write),
            None => Ok(()),
        }
    }

    /// Fill `buf` from `offset`. On a short read the tail of `buf` is zeroed
    /// and [`FileError::ShortRead`] is returned; the buffer is still usable.
    pub fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<(), FileError> {
        self.flush_buffer()?;
        seek_exact(&mut self.handle, offset, "file.read.seek").map_err(FileError::Read)?;
        let read = self
            .handle
            .read_at(offset, buf)
            .map_err(FileError::Read)?;
        if read >= buf.len() {
            return Ok(());
        }
        buf[read..].fill(0);
        Err(FileError::ShortRead {
            read,
            requested: buf.len(),
        })
    }

    pub fn write(&mut self, data: &[u8], offset: u64) -> Result<(), FileError> {
        let result = match self.buffer.as_mut() {
            Some(buffer) => buffer.write(&mut self.handle, data, offset),
            None => self.handle.write_exact_at(offset, data),
        };
        result.map_err(FileError::Write)
    }

    pub fn truncate(&mut self, size: u64) -> Result<(), FileError> {
        self.flush_buffer()?;
        self.handle.truncate(size).map_err(FileError::Truncate)
    }

    pub fn sync(&mut self) -> Result<(), FileError> {
        self.flush_buffer()?;
        self.handle.flush().map_err(FileError::Fsync)
    }

    pub fn size(&mut self) -> Result<u64, FileError> {
        self.flush_buffer()?;
        self.handle.length().map_err(FileError::Fstat)
    }

    /// Flush and release the provider handle. A flush failure is returned;
    /// a failing provider close is only logged.
    pub fn close(mut self) -> Result<(), FileError> {
        let flushed = self.flush_buffer();
        let path = self.handle.path().to_string();
        if let Err(err) = self.handle.close() {
            tracing::warn!(%path, error = %err, "provider close failed");
        }
        flushed
    }
}

/// Delete `path`. A missing file counts as deleted. Directory sync is not
/// supported, so asking for it fails after the delete has been performed.
pub fn delete(provider: &dyn VfsProvider, path: &str, sync_dir: bool) -> Result<(), FileError> {
    match shim::delete(provider, path) {
        Ok(()) => {}
        Err(err) if err.is_not_found() => {
            tracing::debug!(path, "delete of missing file treated as success");
            return Ok(());
        }
        Err(err) => return Err(FileError::Delete(err)),
    }
    if sync_dir {
        tracing::warn!(path, "directory sync requested but not supported");
        return Err(FileError::DirSyncUnsupported);
    }
    Ok(())
}

/// Answer an access check. Provider failures answer "no".
pub fn access(provider: &dyn VfsProvider, path: &str, check: AccessCheck) -> bool {
    match shim::access(provider, path, check) {
        Ok(answer) => answer,
        Err(err) => {
            tracing::debug!(path, ?check, error = %err, "access check failed");
            false
        }
    }
}
