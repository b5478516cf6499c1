//! Open flags, file kinds and access checks forwarded to providers.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const CREATE = 1 << 2;
        const EXCLUSIVE = 1 << 3;
        const DELETE_ON_CLOSE = 1 << 4;
    }
}

impl OpenFlags {
    pub fn is_read_only(self) -> bool {
        self.contains(OpenFlags::READ) && !self.contains(OpenFlags::WRITE)
    }

    /// The equivalent `open(2)` flag bits.
    pub fn to_posix(self) -> libc::c_int {
        let mut oflags = 0;
        if self.contains(OpenFlags::EXCLUSIVE) {
            oflags |= libc::O_EXCL;
        }
        if self.contains(OpenFlags::CREATE) {
            oflags |= libc::O_CREAT;
        }
        if self.contains(OpenFlags::WRITE) {
            oflags |= libc::O_RDWR;
        } else {
            oflags |= libc::O_RDONLY;
        }
        oflags
    }
}

/// What the engine intends to store in the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FileKind {
    #[default]
    MainDb,
    MainJournal,
    TempDb,
    TempJournal,
    Subjournal,
    SuperJournal,
    Wal,
    Transient,
}

impl FileKind {
    /// Only the rollback journal is written strictly sequentially enough to
    /// be worth staging.
    pub fn wants_write_buffer(self) -> bool {
        self == FileKind::MainJournal
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub flags: OpenFlags,
    pub kind: FileKind,
}

impl OpenOptions {
    pub fn new(flags: OpenFlags, kind: FileKind) -> Self {
        Self { flags, kind }
    }
}

/// Permission question asked through `access`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessCheck {
    Exists,
    Read,
    ReadWrite,
}

impl AccessCheck {
    /// The `access(2)` mode bits for this check.
    pub fn mode_bits(self) -> libc::c_int {
        match self {
            AccessCheck::Exists => libc::F_OK,
            AccessCheck::Read => libc::R_OK,
            AccessCheck::ReadWrite => libc::R_OK | libc::W_OK,
        }
    }
}
