use crate::calls::ProviderCall;
use crate::fs::{MemState, SharedData};
use bridgevfs_core::{OpenFlags, ProviderIo, ProviderOp, VfsError, VfsErrorKind, VfsResult};
use std::sync::Arc;

/// An open in-memory file.
#[derive(Debug)]
pub struct MemIo {
    state: Arc<MemState>,
    path: String,
    data: SharedData,
    pos: u64,
    read_only: bool,
    delete_on_close: bool,
    closed: bool,
}

impl MemIo {
    pub(crate) fn new(
        state: Arc<MemState>,
        path: String,
        data: SharedData,
        flags: OpenFlags,
    ) -> Self {
        Self {
            state,
            path,
            data,
            pos: 0,
            read_only: flags.is_read_only(),
            delete_on_close: flags.contains(OpenFlags::DELETE_ON_CLOSE),
            closed: false,
        }
    }

    fn enter(&self, op: ProviderOp, context: &'static str) -> VfsResult<bool> {
        self.state.intercept(ProviderCall::new(op, &self.path), context)
    }

    fn enter_at(
        &self,
        op: ProviderOp,
        offset: u64,
        len: usize,
        context: &'static str,
    ) -> VfsResult<bool> {
        self.state
            .intercept(ProviderCall::new(op, &self.path).at(offset, len), context)
    }

    fn ensure_writable(&self, context: &'static str) -> VfsResult<()> {
        if self.read_only {
            return Err(VfsError::new(VfsErrorKind::ReadOnlyFs, context));
        }
        Ok(())
    }

    fn copy_out(&self, offset: u64, buf: &mut [u8]) -> usize {
        let data = self.data.lock();
        let Ok(start) = usize::try_from(offset) else {
            return 0;
        };
        if start >= data.len() {
            return 0;
        }
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        n
    }

    fn copy_in(&self, offset: u64, buf: &[u8], context: &'static str) -> VfsResult<()> {
        let start = usize::try_from(offset)
            .map_err(|_| VfsError::new(VfsErrorKind::InvalidInput, context))?;
        let end = start
            .checked_add(buf.len())
            .ok_or_else(|| VfsError::new(VfsErrorKind::InvalidInput, context))?;
        let mut data = self.data.lock();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }
}

impl ProviderIo for MemIo {
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        if self.enter_at(ProviderOp::Read, self.pos, buf.len(), "mem.read")? {
            return Ok(0);
        }
        let n = self.copy_out(self.pos, buf);
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> VfsResult<()> {
        if self.enter_at(ProviderOp::Write, self.pos, buf.len(), "mem.write")? {
            return Ok(());
        }
        self.ensure_writable("mem.write")?;
        self.copy_in(self.pos, buf, "mem.write")?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> VfsResult<()> {
        self.enter(ProviderOp::Flush, "mem.flush")?;
        Ok(())
    }

    fn close(&mut self) -> VfsResult<()> {
        if self.enter(ProviderOp::Close, "mem.close")? || self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.delete_on_close {
            let mut files = self.state.files.lock();
            // Only drop the entry if it still refers to our data.
            if files
                .get(&self.path)
                .is_some_and(|data| Arc::ptr_eq(data, &self.data))
            {
                files.remove(&self.path);
                tracing::trace!(path = %self.path, "deleted on close");
            }
        }
        Ok(())
    }

    fn position(&mut self) -> VfsResult<u64> {
        self.enter(ProviderOp::Position, "mem.position")?;
        Ok(self.pos)
    }

    fn set_position(&mut self, position: u64) -> VfsResult<()> {
        if self.enter_at(ProviderOp::SetPosition, position, 0, "mem.set_position")? {
            return Ok(());
        }
        self.pos = position;
        Ok(())
    }

    fn length(&mut self) -> VfsResult<u64> {
        self.enter(ProviderOp::Length, "mem.length")?;
        Ok(self.data.lock().len() as u64)
    }

    fn truncate(&mut self, len: u64) -> VfsResult<()> {
        if self.enter_at(ProviderOp::Truncate, len, 0, "mem.truncate")? {
            return Ok(());
        }
        self.ensure_writable("mem.truncate")?;
        let len = usize::try_from(len)
            .map_err(|_| VfsError::new(VfsErrorKind::InvalidInput, "mem.truncate"))?;
        self.data.lock().resize(len, 0);
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        if self.enter_at(ProviderOp::ReadAt, offset, buf.len(), "mem.read_at")? {
            return Ok(0);
        }
        Ok(self.copy_out(offset, buf))
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> VfsResult<usize> {
        if self.enter_at(ProviderOp::WriteAt, offset, buf.len(), "mem.write_at")? {
            return Ok(0);
        }
        self.ensure_writable("mem.write_at")?;
        self.copy_in(offset, buf, "mem.write_at")?;
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FaultAction, MemProvider};
    use bridgevfs_core::{FileKind, OpenOptions, VfsProvider};
    use pretty_assertions::assert_eq;

    fn rw() -> OpenOptions {
        OpenOptions::new(
            OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE,
            FileKind::MainDb,
        )
    }

    #[test]
    fn positioned_io_leaves_position_alone() {
        let provider = MemProvider::default();
        let mut io = provider.open("/db", &rw()).unwrap();
        assert_eq!(io.write_at(3, b"abc").unwrap(), 3);
        assert_eq!(io.position().unwrap(), 0);
        assert_eq!(provider.file_contents("/db").unwrap(), b"\0\0\0abc");

        let mut buf = [0u8; 8];
        assert_eq!(io.read_at(4, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"bc");
    }

    #[test]
    fn sequential_io_advances_position() {
        let provider = MemProvider::default();
        let mut io = provider.open("/db", &rw()).unwrap();
        io.write(b"hello").unwrap();
        assert_eq!(io.position().unwrap(), 5);
        io.set_position(1).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(io.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"ell");
        assert_eq!(io.length().unwrap(), 5);
    }

    #[test]
    fn read_only_handles_reject_writes() {
        let provider = MemProvider::default();
        provider.insert_file("/db", b"data".to_vec());
        let mut io = provider
            .open("/db", &OpenOptions::new(OpenFlags::READ, FileKind::MainDb))
            .unwrap();
        let err = io.write_at(0, b"x").unwrap_err();
        assert_eq!(err.kind(), VfsErrorKind::ReadOnlyFs);
        assert_eq!(provider.file_contents("/db").unwrap(), b"data");
    }

    #[test]
    fn truncate_shrinks_and_extends() {
        let provider = MemProvider::default();
        provider.insert_file("/db", b"abcdef".to_vec());
        let mut io = provider.open("/db", &rw()).unwrap();
        io.truncate(2).unwrap();
        assert_eq!(provider.file_contents("/db").unwrap(), b"ab");
        io.truncate(4).unwrap();
        assert_eq!(provider.file_contents("/db").unwrap(), b"ab\0\0");
    }

    #[test]
    fn delete_on_close_removes_the_file() {
        let provider = MemProvider::default();
        let opts = OpenOptions::new(
            OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::DELETE_ON_CLOSE,
            FileKind::TempDb,
        );
        let mut io = provider.open("/tmp", &opts).unwrap();
        io.write_at(0, b"scratch").unwrap();
        assert!(provider.contains("/tmp"));
        io.close().unwrap();
        assert!(!provider.contains("/tmp"));
    }

    #[test]
    fn ignored_set_position_keeps_old_position() {
        let provider = MemProvider::default();
        let mut io = provider.open("/db", &rw()).unwrap();
        provider.fail_next(ProviderOp::SetPosition, FaultAction::Ignore);
        io.set_position(10).unwrap();
        assert_eq!(io.position().unwrap(), 0);
    }
}
