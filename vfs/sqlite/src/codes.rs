//! Translation between SQLite's integer flags/codes and bridgevfs types.

use bridgevfs_core::{AccessCheck, FileError, FileKind, OpenFlags, OpenOptions};
use libsqlite3_sys as ffi;
use std::os::raw::c_int;

/// The SQLite result code reported for a failed file operation.
pub fn file_error_code(err: &FileError) -> c_int {
    match err {
        FileError::MissingPath => ffi::SQLITE_IOERR,
        FileError::CantOpen { .. } => ffi::SQLITE_CANTOPEN,
        FileError::NoMemory { .. } => ffi::SQLITE_NOMEM,
        FileError::ShortRead { .. } => ffi::SQLITE_IOERR_SHORT_READ,
        FileError::Read(_) => ffi::SQLITE_IOERR_READ,
        FileError::Write(_) => ffi::SQLITE_IOERR_WRITE,
        FileError::Truncate(_) => ffi::SQLITE_IOERR_TRUNCATE,
        FileError::Fsync(_) => ffi::SQLITE_IOERR_FSYNC,
        FileError::Fstat(_) => ffi::SQLITE_IOERR_FSTAT,
        FileError::Delete(_) | FileError::DirSyncUnsupported => ffi::SQLITE_IOERR_DELETE,
    }
}

fn file_kind(flags: c_int) -> FileKind {
    const KINDS: [(c_int, FileKind); 8] = [
        (ffi::SQLITE_OPEN_MAIN_DB, FileKind::MainDb),
        (ffi::SQLITE_OPEN_MAIN_JOURNAL, FileKind::MainJournal),
        (ffi::SQLITE_OPEN_TEMP_DB, FileKind::TempDb),
        (ffi::SQLITE_OPEN_TEMP_JOURNAL, FileKind::TempJournal),
        (ffi::SQLITE_OPEN_SUBJOURNAL, FileKind::Subjournal),
        (ffi::SQLITE_OPEN_SUPER_JOURNAL, FileKind::SuperJournal),
        (ffi::SQLITE_OPEN_WAL, FileKind::Wal),
        (ffi::SQLITE_OPEN_TRANSIENT_DB, FileKind::Transient),
    ];
    KINDS
        .iter()
        .find(|(bit, _)| flags & bit != 0)
        .map(|(_, kind)| *kind)
        .unwrap_or_default()
}

/// Translate `xOpen` flags into the options forwarded to the provider.
pub fn open_options_from_flags(flags: c_int) -> OpenOptions {
    let mut open = OpenFlags::empty();
    if flags & ffi::SQLITE_OPEN_READWRITE != 0 {
        open |= OpenFlags::READ | OpenFlags::WRITE;
    } else {
        open |= OpenFlags::READ;
    }
    if flags & ffi::SQLITE_OPEN_CREATE != 0 {
        open |= OpenFlags::CREATE;
    }
    if flags & ffi::SQLITE_OPEN_EXCLUSIVE != 0 {
        open |= OpenFlags::EXCLUSIVE;
    }
    if flags & ffi::SQLITE_OPEN_DELETEONCLOSE != 0 {
        open |= OpenFlags::DELETE_ON_CLOSE;
    }
    OpenOptions::new(open, file_kind(flags))
}

/// Translate `xAccess` flags. `None` for a mode SQLite does not define.
pub fn access_check_from_flags(flags: c_int) -> Option<AccessCheck> {
    match flags {
        ffi::SQLITE_ACCESS_EXISTS => Some(AccessCheck::Exists),
        ffi::SQLITE_ACCESS_READWRITE => Some(AccessCheck::ReadWrite),
        ffi::SQLITE_ACCESS_READ => Some(AccessCheck::Read),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgevfs_core::{VfsError, VfsErrorKind};

    #[test]
    fn journal_open_flags() {
        let opts = open_options_from_flags(
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE | ffi::SQLITE_OPEN_MAIN_JOURNAL,
        );
        assert_eq!(opts.kind, FileKind::MainJournal);
        assert_eq!(opts.flags, OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE);
    }

    #[test]
    fn read_only_temp_files() {
        let opts = open_options_from_flags(
            ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_DELETEONCLOSE | ffi::SQLITE_OPEN_TEMP_DB,
        );
        assert!(opts.flags.is_read_only());
        assert!(opts.flags.contains(OpenFlags::DELETE_ON_CLOSE));
        assert_eq!(opts.kind, FileKind::TempDb);
    }

    #[test]
    fn access_modes() {
        assert_eq!(
            access_check_from_flags(ffi::SQLITE_ACCESS_EXISTS),
            Some(AccessCheck::Exists)
        );
        assert_eq!(
            access_check_from_flags(ffi::SQLITE_ACCESS_READ),
            Some(AccessCheck::Read)
        );
        assert_eq!(access_check_from_flags(42), None);
    }

    #[test]
    fn error_codes() {
        let io = || VfsError::new(VfsErrorKind::Io, "test");
        assert_eq!(file_error_code(&FileError::MissingPath), ffi::SQLITE_IOERR);
        assert_eq!(
            file_error_code(&FileError::ShortRead {
                read: 1,
                requested: 2
            }),
            ffi::SQLITE_IOERR_SHORT_READ
        );
        assert_eq!(file_error_code(&FileError::Read(io())), ffi::SQLITE_IOERR_READ);
        assert_eq!(file_error_code(&FileError::Fstat(io())), ffi::SQLITE_IOERR_FSTAT);
        assert_eq!(
            file_error_code(&FileError::DirSyncUnsupported),
            ffi::SQLITE_IOERR_DELETE
        );
        assert_eq!(
            file_error_code(&FileError::NoMemory { capacity: 8192 }),
            ffi::SQLITE_NOMEM
        );
    }
}
