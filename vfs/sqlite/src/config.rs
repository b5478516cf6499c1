use bridgevfs_core::{VfsError, VfsErrorKind, VfsResult};

/// Settings of one registered VFS.
#[derive(Clone, Debug)]
pub struct VfsConfig {
    /// Name SQLite knows the VFS by. Normalized to lowercase on registration.
    pub name: String,
    /// Longest pathname SQLite may hand to the VFS, excluding the NUL.
    pub max_pathname: usize,
    /// Capacity of the write-combining buffer given to main journal files.
    /// Zero disables buffering.
    pub journal_buffer_size: usize,
    /// Register as SQLite's default VFS.
    pub make_default: bool,
    /// Join relative paths onto the current directory in `xFullPathname`
    /// instead of passing them through.
    pub resolve_relative_paths: bool,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            name: "bridgevfs".to_string(),
            max_pathname: 512,
            journal_buffer_size: 8192,
            make_default: false,
            resolve_relative_paths: false,
        }
    }
}

impl VfsConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> VfsResult<()> {
        normalize_vfs_name(&self.name)?;
        if self.max_pathname == 0 || i32::try_from(self.max_pathname).is_err() {
            return Err(VfsError::new(
                VfsErrorKind::InvalidInput,
                "vfs_config.max_pathname",
            ));
        }
        Ok(())
    }
}

/// Trim and lowercase a VFS name, rejecting anything but `[a-z0-9._-]`.
pub(crate) fn normalize_vfs_name(input: &str) -> VfsResult<String> {
    let trimmed = input.trim_matches(|c: char| c.is_ascii_whitespace());
    if trimmed.is_empty() {
        return Err(VfsError::new(
            VfsErrorKind::InvalidInput,
            "vfs_config.name.empty",
        ));
    }
    let mut normalized = String::with_capacity(trimmed.len());
    for byte in trimmed.bytes() {
        let lower = byte.to_ascii_lowercase();
        if !matches!(lower, b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-') {
            return Err(VfsError::new(
                VfsErrorKind::InvalidInput,
                "vfs_config.name.invalid_char",
            ));
        }
        normalized.push(lower as char);
    }
    Ok(normalized)
}
