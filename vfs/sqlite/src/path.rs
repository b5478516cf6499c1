use std::io;
use std::path::Path;

/// Resolve the path SQLite asked about.
///
/// Absolute paths pass through. A relative path needs a readable current
/// directory; it is joined onto it only when `resolve_relative` is set,
/// otherwise the provider is left to interpret it.
pub fn full_pathname(path: &str, resolve_relative: bool) -> io::Result<String> {
    if path.starts_with('/') {
        return Ok(path.to_string());
    }
    let cwd = std::env::current_dir()?;
    if !resolve_relative {
        return Ok(path.to_string());
    }
    let joined = cwd.join(Path::new(path));
    joined
        .into_os_string()
        .into_string()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "current directory is not UTF-8"))
}

/// Copy `src` into `out` as a NUL-terminated C string, truncating so the
/// terminator always fits. Returns the number of bytes copied before the NUL.
pub fn copy_c_string(src: &[u8], out: &mut [u8]) -> usize {
    let Some(room) = out.len().checked_sub(1) else {
        return 0;
    };
    let n = src.len().min(room);
    out[..n].copy_from_slice(&src[..n]);
    out[n] = 0;
    n
}
