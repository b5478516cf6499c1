use std::fs;
use std::path::{Component, Path, PathBuf};

use bridgevfs_core::{
    AccessCheck, OpenFlags, OpenOptions, ProviderIo, VfsError, VfsErrorKind, VfsProvider,
    VfsResult, io_result, map_io_error,
};

use crate::config::HostFsConfig;
use crate::handle::HostIo;

#[derive(Clone, Debug)]
pub struct HostProvider {
    root: PathBuf,
}

impl HostProvider {
    pub fn new(config: HostFsConfig) -> VfsResult<Self> {
        config.validate()?;
        if config.create_root {
            io_result("host.new.create_root", fs::create_dir_all(&config.root))?;
        }
        let meta = io_result("host.new.root", fs::metadata(&config.root))?;
        if !meta.is_dir() {
            return Err(VfsError::new(
                VfsErrorKind::InvalidInput,
                "host.new.root_not_dir",
            ));
        }
        tracing::debug!(root = %config.root.display(), "host provider ready");
        Ok(Self { root: config.root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a provider path onto the host below the root.
    pub fn resolve(&self, path: &str) -> VfsResult<PathBuf> {
        let mut resolved = self.root.clone();
        let mut any = false;
        for component in Path::new(path).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => {
                    resolved.push(part);
                    any = true;
                }
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(VfsError::new(
                        VfsErrorKind::InvalidInput,
                        "host.resolve.escape",
                    ));
                }
            }
        }
        if !any {
            return Err(VfsError::new(
                VfsErrorKind::InvalidInput,
                "host.resolve.empty",
            ));
        }
        Ok(resolved)
    }
}

impl VfsProvider for HostProvider {
    fn name(&self) -> &str {
        "host"
    }

    fn open(&self, path: &str, opts: &OpenOptions) -> VfsResult<Box<dyn ProviderIo>> {
        let host_path = self.resolve(path)?;
        let flags = opts.flags;
        let mut options = fs::OpenOptions::new();
        options.read(true).write(!flags.is_read_only());
        if flags.contains(OpenFlags::CREATE) && flags.contains(OpenFlags::EXCLUSIVE) {
            options.create_new(true);
        } else if flags.contains(OpenFlags::CREATE) {
            options.create(true);
        }
        let file = options
            .open(&host_path)
            .map_err(|err| map_io_error("host.open", err))?;
        tracing::trace!(path = %host_path.display(), kind = ?opts.kind, "host file opened");
        Ok(Box::new(HostIo::new(
            file,
            host_path,
            flags.contains(OpenFlags::DELETE_ON_CLOSE),
        )))
    }

    fn delete(&self, path: &str) -> VfsResult<()> {
        let host_path = self.resolve(path)?;
        io_result("host.delete", fs::remove_file(host_path))
    }

    fn access(&self, path: &str, check: AccessCheck) -> VfsResult<bool> {
        let host_path = self.resolve(path)?;
        let meta = match fs::metadata(&host_path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(map_io_error("host.access", err)),
        };
        Ok(match check {
            AccessCheck::Exists => meta.is_file() && meta.len() > 0,
            AccessCheck::Read => meta.is_file(),
            AccessCheck::ReadWrite => meta.is_file() && !meta.permissions().readonly(),
        })
    }
}
