//! The `sqlite3_io_methods` table and its callbacks.
//!
//! SQLite allocates `szOsFile` bytes per open file and hands them to `xOpen`.
//! That memory holds a [`FileSlot`]: SQLite's base struct first, then the
//! [`VfsFile`] doing the actual work. `pMethods` is set only once the slot
//! holds a file, so SQLite never calls `xClose` on a failed open.

use crate::codes::file_error_code;
use bridgevfs_core::{FileError, VfsFile, update_last_error};
use libsqlite3_sys as ffi;
use std::os::raw::{c_int, c_void};
use std::ptr;

#[repr(C)]
pub(crate) struct FileSlot {
    base: ffi::sqlite3_file,
    file: Option<VfsFile>,
}

impl FileSlot {
    /// Initialize the raw memory SQLite gave us as an empty slot.
    ///
    /// # Safety
    /// `raw` must point to at least `size_of::<FileSlot>()` writable, suitably
    /// aligned bytes that do not currently hold a live slot.
    pub(crate) unsafe fn init(raw: *mut ffi::sqlite3_file) -> *mut FileSlot {
        let slot = raw.cast::<FileSlot>();
        unsafe {
            ptr::write(
                slot,
                FileSlot {
                    base: ffi::sqlite3_file {
                        pMethods: ptr::null(),
                    },
                    file: None,
                },
            );
        }
        slot
    }

    /// Store an opened file and publish the method table.
    pub(crate) fn install(&mut self, file: VfsFile) {
        self.file = Some(file);
        self.base.pMethods = &IO_METHODS;
    }
}

/// # Safety
/// `raw` must be a slot set up by `xOpen`.
unsafe fn file_mut<'a>(raw: *mut ffi::sqlite3_file) -> Option<&'a mut VfsFile> {
    unsafe { (*raw.cast::<FileSlot>()).file.as_mut() }
}

fn report(err: &FileError) -> c_int {
    update_last_error(err);
    file_error_code(err)
}

pub(crate) static IO_METHODS: ffi::sqlite3_io_methods = ffi::sqlite3_io_methods {
    iVersion: 1,
    xClose: Some(x_close),
    xRead: Some(x_read),
    xWrite: Some(x_write),
    xTruncate: Some(x_truncate),
    xSync: Some(x_sync),
    xFileSize: Some(x_file_size),
    xLock: Some(x_lock),
    xUnlock: Some(x_unlock),
    xCheckReservedLock: Some(x_check_reserved_lock),
    xFileControl: Some(x_file_control),
    xSectorSize: Some(x_sector_size),
    xDeviceCharacteristics: Some(x_device_characteristics),
    xShmMap: None,
    xShmLock: None,
    xShmBarrier: None,
    xShmUnmap: None,
    xFetch: None,
    xUnfetch: None,
};

unsafe extern "C" fn x_close(raw: *mut ffi::sqlite3_file) -> c_int {
    let slot = raw.cast::<FileSlot>();
    let file = unsafe { (*slot).file.take() };
    unsafe {
        (*slot).base.pMethods = ptr::null();
    }
    let Some(file) = file else {
        return ffi::SQLITE_OK;
    };
    let path = file.path().to_string();
    match file.close() {
        Ok(()) => {
            tracing::debug!(%path, "file closed");
            ffi::SQLITE_OK
        }
        Err(err) => {
            tracing::warn!(%path, error = %err, "flush on close failed");
            report(&err)
        }
    }
}

unsafe extern "C" fn x_read(
    raw: *mut ffi::sqlite3_file,
    buf: *mut c_void,
    amount: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    let Some(file) = (unsafe { file_mut(raw) }) else {
        return ffi::SQLITE_IOERR_READ;
    };
    let (Ok(len), Ok(offset)) = (usize::try_from(amount), u64::try_from(offset)) else {
        return ffi::SQLITE_IOERR_READ;
    };
    if len == 0 {
        return ffi::SQLITE_OK;
    }
    let buf = unsafe { std::slice::from_raw_parts_mut(buf.cast::<u8>(), len) };
    match file.read(buf, offset) {
        Ok(()) => ffi::SQLITE_OK,
        // A short read past the end of file is routine for SQLite.
        Err(err @ FileError::ShortRead { .. }) => file_error_code(&err),
        Err(err) => report(&err),
    }
}

unsafe extern "C" fn x_write(
    raw: *mut ffi::sqlite3_file,
    buf: *const c_void,
    amount: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    let Some(file) = (unsafe { file_mut(raw) }) else {
        return ffi::SQLITE_IOERR_WRITE;
    };
    let (Ok(len), Ok(offset)) = (usize::try_from(amount), u64::try_from(offset)) else {
        return ffi::SQLITE_IOERR_WRITE;
    };
    if len == 0 {
        return ffi::SQLITE_OK;
    }
    let data = unsafe { std::slice::from_raw_parts(buf.cast::<u8>(), len) };
    match file.write(data, offset) {
        Ok(()) => ffi::SQLITE_OK,
        Err(err) => report(&err),
    }
}

unsafe extern "C" fn x_truncate(raw: *mut ffi::sqlite3_file, size: ffi::sqlite3_int64) -> c_int {
    let Some(file) = (unsafe { file_mut(raw) }) else {
        return ffi::SQLITE_IOERR_TRUNCATE;
    };
    let Ok(size) = u64::try_from(size) else {
        return ffi::SQLITE_IOERR_TRUNCATE;
    };
    match file.truncate(size) {
        Ok(()) => ffi::SQLITE_OK,
        Err(err) => report(&err),
    }
}

unsafe extern "C" fn x_sync(raw: *mut ffi::sqlite3_file, _flags: c_int) -> c_int {
    let Some(file) = (unsafe { file_mut(raw) }) else {
        return ffi::SQLITE_IOERR_FSYNC;
    };
    match file.sync() {
        Ok(()) => ffi::SQLITE_OK,
        Err(err) => report(&err),
    }
}

unsafe extern "C" fn x_file_size(
    raw: *mut ffi::sqlite3_file,
    size_out: *mut ffi::sqlite3_int64,
) -> c_int {
    let Some(file) = (unsafe { file_mut(raw) }) else {
        return ffi::SQLITE_IOERR_FSTAT;
    };
    match file.size() {
        Ok(size) => match ffi::sqlite3_int64::try_from(size) {
            Ok(size) => {
                unsafe { *size_out = size };
                ffi::SQLITE_OK
            }
            Err(_) => ffi::SQLITE_IOERR_FSTAT,
        },
        Err(err) => report(&err),
    }
}

unsafe extern "C" fn x_lock(_raw: *mut ffi::sqlite3_file, _level: c_int) -> c_int {
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_unlock(_raw: *mut ffi::sqlite3_file, _level: c_int) -> c_int {
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_check_reserved_lock(
    _raw: *mut ffi::sqlite3_file,
    res_out: *mut c_int,
) -> c_int {
    if !res_out.is_null() {
        unsafe { *res_out = 0 };
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_file_control(
    _raw: *mut ffi::sqlite3_file,
    _op: c_int,
    _arg: *mut c_void,
) -> c_int {
    ffi::SQLITE_NOTFOUND
}

unsafe extern "C" fn x_sector_size(_raw: *mut ffi::sqlite3_file) -> c_int {
    0
}

unsafe extern "C" fn x_device_characteristics(_raw: *mut ffi::sqlite3_file) -> c_int {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgevfs_core::{FileKind, OpenFlags, OpenOptions, ProviderOp, VfsErrorKind};
    use bridgevfs_mem::{FaultAction, MemProvider};
    use std::mem::MaybeUninit;

    fn open_slot(provider: &MemProvider, slot: &mut MaybeUninit<FileSlot>, kind: FileKind) {
        let opts = OpenOptions::new(OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE, kind);
        let file = VfsFile::open(provider, "/t.db", &opts, 16).unwrap();
        let slot = unsafe { &mut *FileSlot::init(slot.as_mut_ptr().cast()) };
        slot.install(file);
    }

    #[test]
    fn callbacks_route_to_the_file() {
        let provider = MemProvider::default();
        let mut slot = MaybeUninit::<FileSlot>::uninit();
        open_slot(&provider, &mut slot, FileKind::MainJournal);
        let raw = slot.as_mut_ptr().cast::<ffi::sqlite3_file>();

        unsafe {
            assert!(ptr::eq((*raw).pMethods, &IO_METHODS));
            let data = b"journal!";
            assert_eq!(x_write(raw, data.as_ptr().cast(), 8, 0), ffi::SQLITE_OK);

            let mut size = 0;
            assert_eq!(x_file_size(raw, &mut size), ffi::SQLITE_OK);
            assert_eq!(size, 8);

            let mut buf = [0xffu8; 12];
            assert_eq!(
                x_read(raw, buf.as_mut_ptr().cast(), 12, 0),
                ffi::SQLITE_IOERR_SHORT_READ
            );
            assert_eq!(&buf, b"journal!\0\0\0\0");

            assert_eq!(x_truncate(raw, 4), ffi::SQLITE_OK);
            assert_eq!(x_sync(raw, 0), ffi::SQLITE_OK);
            assert_eq!(x_close(raw), ffi::SQLITE_OK);
            assert!((*raw).pMethods.is_null());
        }
        assert_eq!(provider.file_contents("/t.db").unwrap(), b"jour");
    }

    #[test]
    fn close_reports_a_failed_flush_and_still_releases() {
        let provider = MemProvider::recording();
        let mut slot = MaybeUninit::<FileSlot>::uninit();
        open_slot(&provider, &mut slot, FileKind::MainJournal);
        let raw = slot.as_mut_ptr().cast::<ffi::sqlite3_file>();

        unsafe {
            let data = b"staged";
            assert_eq!(x_write(raw, data.as_ptr().cast(), 6, 0), ffi::SQLITE_OK);
            assert!(provider.calls_of(&[ProviderOp::WriteAt]).is_empty());

            provider.fail_next(ProviderOp::WriteAt, FaultAction::Fail(VfsErrorKind::Io));
            assert_eq!(x_close(raw), ffi::SQLITE_IOERR_WRITE);
            assert!((*raw).pMethods.is_null());
            // A second close is harmless.
            assert_eq!(x_close(raw), ffi::SQLITE_OK);
        }
        assert_eq!(provider.calls_of(&[ProviderOp::Close]).len(), 1);
        assert_eq!(provider.file_contents("/t.db").unwrap(), b"");
    }

    #[test]
    fn lock_and_control_stubs() {
        let provider = MemProvider::default();
        let mut slot = MaybeUninit::<FileSlot>::uninit();
        open_slot(&provider, &mut slot, FileKind::MainDb);
        let raw = slot.as_mut_ptr().cast::<ffi::sqlite3_file>();

        unsafe {
            assert_eq!(x_lock(raw, ffi::SQLITE_LOCK_EXCLUSIVE), ffi::SQLITE_OK);
            assert_eq!(x_unlock(raw, ffi::SQLITE_LOCK_NONE), ffi::SQLITE_OK);
            let mut reserved = 1;
            assert_eq!(x_check_reserved_lock(raw, &mut reserved), ffi::SQLITE_OK);
            assert_eq!(reserved, 0);
            assert_eq!(
                x_file_control(raw, ffi::SQLITE_FCNTL_LOCKSTATE, ptr::null_mut()),
                ffi::SQLITE_NOTFOUND
            );
            assert_eq!(x_sector_size(raw), 0);
            assert_eq!(x_device_characteristics(raw), 0);
            assert_eq!(x_close(raw), ffi::SQLITE_OK);
        }
    }
}
