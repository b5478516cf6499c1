//! Whence-relative seeking on top of absolute positioning.
//!
//! Providers only know "set position", "get position" and "get length".
//! [`seek_whence`] builds `SeekFrom::{Start, Current, End}` out of those and
//! returns the position the provider reports *after* moving, so callers can
//! detect a provider that silently ignored the request.

use crate::{VfsError, VfsErrorKind, VfsResult};
use std::io::SeekFrom;

/// The absolute positioning primitives a seekable object exposes.
pub trait Positioned {
    fn position(&mut self) -> VfsResult<u64>;
    fn set_position(&mut self, position: u64) -> VfsResult<()>;
    fn length(&mut self) -> VfsResult<u64>;
}

fn offset_by(base: u64, delta: i64) -> VfsResult<u64> {
    base.checked_add_signed(delta)
        .ok_or_else(|| VfsError::new(VfsErrorKind::InvalidInput, "seek.offset"))
}

/// Move `target` according to `pos` and return the confirmed position.
pub fn seek_whence<P: Positioned + ?Sized>(target: &mut P, pos: SeekFrom) -> VfsResult<u64> {
    let absolute = match pos {
        SeekFrom::Start(offset) => offset,
        SeekFrom::Current(delta) => {
            let current = target.position()?;
            offset_by(current, delta)?
        }
        SeekFrom::End(delta) => {
            let len = target.length()?;
            offset_by(len, delta)?
        }
    };
    target.set_position(absolute)?;
    target.position()
}

/// Seek to `offset` from the start and fail unless the provider confirms it.
pub fn seek_exact<P: Positioned + ?Sized>(
    target: &mut P,
    offset: u64,
    context: &'static str,
) -> VfsResult<()> {
    let confirmed = seek_whence(target, SeekFrom::Start(offset))?;
    if confirmed != offset {
        tracing::debug!(offset, confirmed, context, "provider did not reach requested offset");
        return Err(VfsError::new(VfsErrorKind::PositionMismatch, context));
    }
    Ok(())
}
