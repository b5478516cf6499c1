use std::path::PathBuf;

use bridgevfs_core::{VfsError, VfsErrorKind, VfsResult};

#[derive(Clone, Debug)]
pub struct HostFsConfig {
    /// Directory every provider path is resolved under.
    pub root: PathBuf,
    /// Create `root` (and its parents) if it does not exist yet.
    pub create_root: bool,
}

impl HostFsConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            create_root: false,
        }
    }

    pub fn validate(&self) -> VfsResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(VfsError::new(
                VfsErrorKind::InvalidInput,
                "host.config.root_empty",
            ));
        }
        Ok(())
    }
}
