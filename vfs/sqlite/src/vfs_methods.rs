//! The `sqlite3_vfs` descriptor and its callbacks.

use crate::codes::{access_check_from_flags, file_error_code, open_options_from_flags};
use crate::config::VfsConfig;
use crate::io_methods::FileSlot;
use crate::path::{copy_c_string, full_pathname};
use crate::time::{julian_day, sleep_micros};
use bridgevfs_core::{
    FileError, VfsError, VfsErrorKind, VfsFile, VfsProvider, file, last_error_message,
    update_last_error,
};
use libsqlite3_sys as ffi;
use std::ffi::CStr;
use std::os::raw::{c_char, c_double, c_int, c_void};
use std::sync::Arc;
use std::time::SystemTime;
use std::{mem, ptr, slice};

const DL_ERROR_MESSAGE: &str = "Loadable extensions are not supported";

/// What `pAppData` points at.
pub(crate) struct VfsAppData {
    pub(crate) config: VfsConfig,
    pub(crate) provider: Arc<dyn VfsProvider>,
}

/// Build a version 1 descriptor. `name` and `app` must outlive every
/// connection using it; the registry leaks both.
pub(crate) fn descriptor(
    name: *const c_char,
    app: *mut VfsAppData,
    max_pathname: c_int,
) -> ffi::sqlite3_vfs {
    ffi::sqlite3_vfs {
        iVersion: 1,
        szOsFile: mem::size_of::<FileSlot>() as c_int,
        mxPathname: max_pathname,
        pNext: ptr::null_mut(),
        zName: name,
        pAppData: app.cast(),
        xOpen: Some(x_open),
        xDelete: Some(x_delete),
        xAccess: Some(x_access),
        xFullPathname: Some(x_full_pathname),
        xDlOpen: Some(x_dl_open),
        xDlError: Some(x_dl_error),
        xDlSym: Some(x_dl_sym),
        xDlClose: Some(x_dl_close),
        xRandomness: Some(x_randomness),
        xSleep: Some(x_sleep),
        xCurrentTime: Some(x_current_time),
        xGetLastError: Some(x_get_last_error),
        xCurrentTimeInt64: None,
        xSetSystemCall: None,
        xGetSystemCall: None,
        xNextSystemCall: None,
    }
}

/// # Safety
/// `vfs` must be a descriptor built by [`descriptor`] whose app data is alive.
unsafe fn app_data<'a>(vfs: *mut ffi::sqlite3_vfs) -> &'a VfsAppData {
    unsafe { &*(*vfs).pAppData.cast::<VfsAppData>() }
}

enum PathArg<'a> {
    Missing,
    /// Not UTF-8. The lossy rendering is for logs and error messages only.
    NotUtf8(String),
    Path(&'a str),
}

/// # Safety
/// `name` must be null or a valid NUL-terminated string that outlives `'a`.
unsafe fn path_arg<'a>(name: *const c_char) -> PathArg<'a> {
    if name.is_null() {
        return PathArg::Missing;
    }
    let name = unsafe { CStr::from_ptr(name) };
    match name.to_str() {
        Ok(path) => PathArg::Path(path),
        Err(_) => PathArg::NotUtf8(name.to_string_lossy().into_owned()),
    }
}

/// # Safety
/// `out` must be null or point to `len` writable bytes.
unsafe fn out_buffer<'a>(out: *mut c_char, len: c_int) -> Option<&'a mut [u8]> {
    let len = usize::try_from(len).ok()?;
    if out.is_null() || len == 0 {
        return None;
    }
    Some(unsafe { slice::from_raw_parts_mut(out.cast::<u8>(), len) })
}

unsafe extern "C" fn x_open(
    vfs: *mut ffi::sqlite3_vfs,
    name: *const c_char,
    raw: *mut ffi::sqlite3_file,
    flags: c_int,
    out_flags: *mut c_int,
) -> c_int {
    let slot = unsafe { &mut *FileSlot::init(raw) };
    let path = match unsafe { path_arg(name) } {
        PathArg::Path(path) => path,
        PathArg::Missing => {
            tracing::debug!(flags, "open without a path rejected");
            update_last_error(FileError::MissingPath);
            return file_error_code(&FileError::MissingPath);
        }
        PathArg::NotUtf8(lossy) => {
            tracing::debug!(path = %lossy, "open of a non UTF-8 path rejected");
            let err = FileError::CantOpen {
                path: lossy,
                source: VfsError::new(VfsErrorKind::InvalidInput, "vfs.open.path_utf8"),
            };
            update_last_error(&err);
            return file_error_code(&err);
        }
    };
    let app = unsafe { app_data(vfs) };
    let opts = open_options_from_flags(flags);
    tracing::debug!(
        %path,
        kind = ?opts.kind,
        oflags = opts.flags.to_posix(),
        "opening file"
    );

    match VfsFile::open(
        app.provider.as_ref(),
        path,
        &opts,
        app.config.journal_buffer_size,
    ) {
        Ok(file) => {
            slot.install(file);
            if !out_flags.is_null() {
                unsafe { *out_flags = flags };
            }
            ffi::SQLITE_OK
        }
        Err(err) => {
            tracing::debug!(%path, error = %err, "open failed");
            update_last_error(&err);
            file_error_code(&err)
        }
    }
}

unsafe extern "C" fn x_delete(
    vfs: *mut ffi::sqlite3_vfs,
    name: *const c_char,
    sync_dir: c_int,
) -> c_int {
    let PathArg::Path(path) = (unsafe { path_arg(name) }) else {
        return ffi::SQLITE_IOERR_DELETE;
    };
    let app = unsafe { app_data(vfs) };
    match file::delete(app.provider.as_ref(), path, sync_dir != 0) {
        Ok(()) => ffi::SQLITE_OK,
        Err(err) => {
            update_last_error(&err);
            file_error_code(&err)
        }
    }
}

unsafe extern "C" fn x_access(
    vfs: *mut ffi::sqlite3_vfs,
    name: *const c_char,
    flags: c_int,
    res_out: *mut c_int,
) -> c_int {
    let Some(check) = access_check_from_flags(flags) else {
        tracing::debug!(flags, "unknown access mode");
        return ffi::SQLITE_IOERR_ACCESS;
    };
    let answer = match unsafe { path_arg(name) } {
        PathArg::Path(path) => {
            let app = unsafe { app_data(vfs) };
            let answer = file::access(app.provider.as_ref(), path, check);
            tracing::trace!(%path, mode = check.mode_bits(), answer, "access");
            answer
        }
        PathArg::Missing | PathArg::NotUtf8(_) => false,
    };
    if !res_out.is_null() {
        unsafe { *res_out = c_int::from(answer) };
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_full_pathname(
    vfs: *mut ffi::sqlite3_vfs,
    name: *const c_char,
    n_out: c_int,
    out: *mut c_char,
) -> c_int {
    let PathArg::Path(path) = (unsafe { path_arg(name) }) else {
        return ffi::SQLITE_IOERR;
    };
    let app = unsafe { app_data(vfs) };
    let full = match full_pathname(path, app.config.resolve_relative_paths) {
        Ok(full) => full,
        Err(err) => {
            tracing::warn!(%path, error = %err, "cannot resolve current directory");
            update_last_error(&err);
            return ffi::SQLITE_IOERR;
        }
    };
    if let Some(out) = unsafe { out_buffer(out, n_out) } {
        copy_c_string(full.as_bytes(), out);
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_dl_open(_vfs: *mut ffi::sqlite3_vfs, _name: *const c_char) -> *mut c_void {
    ptr::null_mut()
}

unsafe extern "C" fn x_dl_error(_vfs: *mut ffi::sqlite3_vfs, n_byte: c_int, out: *mut c_char) {
    if let Some(out) = unsafe { out_buffer(out, n_byte) } {
        copy_c_string(DL_ERROR_MESSAGE.as_bytes(), out);
    }
}

unsafe extern "C" fn x_dl_sym(
    _vfs: *mut ffi::sqlite3_vfs,
    _handle: *mut c_void,
    _symbol: *const c_char,
) -> Option<unsafe extern "C" fn(*mut ffi::sqlite3_vfs, *mut c_void, *const c_char)> {
    None
}

unsafe extern "C" fn x_dl_close(_vfs: *mut ffi::sqlite3_vfs, _handle: *mut c_void) {}

unsafe extern "C" fn x_randomness(
    _vfs: *mut ffi::sqlite3_vfs,
    n_byte: c_int,
    out: *mut c_char,
) -> c_int {
    if let Some(out) = unsafe { out_buffer(out, n_byte) } {
        out.fill(0);
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_sleep(_vfs: *mut ffi::sqlite3_vfs, micros: c_int) -> c_int {
    sleep_micros(u64::try_from(micros).unwrap_or(0));
    micros
}

unsafe extern "C" fn x_current_time(_vfs: *mut ffi::sqlite3_vfs, out: *mut c_double) -> c_int {
    if !out.is_null() {
        unsafe { *out = julian_day(SystemTime::now()) };
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_get_last_error(
    _vfs: *mut ffi::sqlite3_vfs,
    n_byte: c_int,
    out: *mut c_char,
) -> c_int {
    let message = last_error_message().unwrap_or_default();
    if let Some(out) = unsafe { out_buffer(out, n_byte) } {
        copy_c_string(message.as_bytes(), out);
    }
    0
}
