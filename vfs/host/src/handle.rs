use std::fs::File;
use std::path::PathBuf;

use bridgevfs_core::{ProviderIo, VfsError, VfsErrorKind, VfsResult, io_result};

/// An open host file. The position lives here; all I/O is positioned.
#[derive(Debug)]
pub struct HostIo {
    file: Option<File>,
    path: PathBuf,
    pos: u64,
    delete_on_close: bool,
}

impl HostIo {
    pub(crate) fn new(file: File, path: PathBuf, delete_on_close: bool) -> Self {
        Self {
            file: Some(file),
            path,
            pos: 0,
            delete_on_close,
        }
    }

    fn file(&self, context: &'static str) -> VfsResult<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| VfsError::new(VfsErrorKind::BadHandle, context))
    }
}

#[cfg(unix)]
fn pread(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn pread(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

#[cfg(unix)]
fn pwrite_all(file: &File, buf: &[u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn pwrite_all(file: &File, mut buf: &[u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => return Err(std::io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

impl ProviderIo for HostIo {
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        let n = self.read_at(self.pos, buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> VfsResult<()> {
        self.write_at(self.pos, buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> VfsResult<()> {
        io_result("host.io.flush", self.file("host.io.flush")?.sync_data())
    }

    fn close(&mut self) -> VfsResult<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        drop(file);
        if self.delete_on_close {
            io_result("host.io.delete_on_close", std::fs::remove_file(&self.path))?;
            tracing::trace!(path = %self.path.display(), "deleted on close");
        }
        Ok(())
    }

    fn position(&mut self) -> VfsResult<u64> {
        Ok(self.pos)
    }

    fn set_position(&mut self, position: u64) -> VfsResult<()> {
        self.pos = position;
        Ok(())
    }

    fn length(&mut self) -> VfsResult<u64> {
        let meta = io_result("host.io.length", self.file("host.io.length")?.metadata())?;
        Ok(meta.len())
    }

    fn truncate(&mut self, len: u64) -> VfsResult<()> {
        io_result("host.io.truncate", self.file("host.io.truncate")?.set_len(len))
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
        let file = self.file("host.io.read_at")?;
        let mut filled = 0;
        while filled < buf.len() {
            match pread(file, &mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => return io_result("host.io.read_at", Err(err)),
            }
        }
        Ok(filled)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> VfsResult<usize> {
        let file = self.file("host.io.write_at")?;
        io_result("host.io.write_at", pwrite_all(file, buf, offset))?;
        Ok(buf.len())
    }
}

impl Drop for HostIo {
    fn drop(&mut self) {
        if self.file.is_some() {
            if let Err(err) = self.close() {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "closing dropped host file failed"
                );
            }
        }
    }
}
