//! Write-combining staging buffer.
//!
//! Contiguous sequential writes are collected in one fixed-capacity buffer
//! and handed to the provider as a single block. The buffer always covers
//! exactly one range `[base, base + len)` of the file.

use crate::VfsResult;
use std::collections::TryReserveError;
use std::fmt;

/// Destination of flushed blocks.
pub trait BlockSink {
    fn write_block(&mut self, offset: u64, data: &[u8]) -> VfsResult<()>;
}

pub struct WriteBuffer {
    data: Box<[u8]>,
    len: usize,
    base: u64,
}

impl fmt::Debug for WriteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBuffer")
            .field("capacity", &self.data.len())
            .field("len", &self.len)
            .field("base", &self.base)
            .finish()
    }
}

impl WriteBuffer {
    /// Allocate a zeroed buffer, reporting allocation failure instead of
    /// aborting.
    pub fn with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        data.resize(capacity, 0);
        Ok(Self {
            data: data.into_boxed_slice(),
            len: 0,
            base: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    pub fn base_offset(&self) -> u64 {
        self.base
    }

    /// Offset one past the last staged byte.
    pub fn end_offset(&self) -> u64 {
        self.base + self.len as u64
    }

    /// The staged bytes.
    pub fn staged(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Stage `data` for `offset`, flushing to `sink` whenever the buffer is
    /// full or the write does not continue the staged range.
    pub fn write<S: BlockSink + ?Sized>(
        &mut self,
        sink: &mut S,
        mut data: &[u8],
        mut offset: u64,
    ) -> VfsResult<()> {
        let capacity = self.data.len();
        while !data.is_empty() {
            if self.len == capacity || self.end_offset() != offset {
                self.flush(sink)?;
            }
            debug_assert!(self.len == 0 || self.end_offset() == offset);
            self.base = offset - self.len as u64;

            let n = (capacity - self.len).min(data.len());
            self.data[self.len..self.len + n].copy_from_slice(&data[..n]);
            self.len += n;

            data = &data[n..];
            offset += n as u64;
        }
        Ok(())
    }

    /// Write the staged range to `sink` and clear it. Does nothing when
    /// empty. The buffer is cleared even if the sink fails.
    pub fn flush<S: BlockSink + ?Sized>(&mut self, sink: &mut S) -> VfsResult<()> {
        if self.len == 0 {
            return Ok(());
        }
        tracing::trace!(offset = self.base, len = self.len, "flushing write buffer");
        let result = sink.write_block(self.base, &self.data[..self.len]);
        self.len = 0;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{VfsError, VfsErrorKind};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingSink {
        blocks: Vec<(u64, Vec<u8>)>,
        fail: bool,
    }

    impl BlockSink for RecordingSink {
        fn write_block(&mut self, offset: u64, data: &[u8]) -> VfsResult<()> {
            if self.fail {
                return Err(VfsError::new(VfsErrorKind::Io, "sink.write_block"));
            }
            self.blocks.push((offset, data.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn empty_flush_never_reaches_sink() {
        let mut buffer = WriteBuffer::with_capacity(16).unwrap();
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        buffer.flush(&mut sink).unwrap();
        buffer.flush(&mut sink).unwrap();
        assert!(sink.blocks.is_empty());
    }

    #[test]
    fn coalesces_contiguous_writes() {
        let mut buffer = WriteBuffer::with_capacity(16).unwrap();
        let mut sink = RecordingSink::default();
        buffer.write(&mut sink, b"abcd", 100).unwrap();
        buffer.write(&mut sink, b"efgh", 104).unwrap();
        assert!(sink.blocks.is_empty());
        assert_eq!(buffer.base_offset(), 100);
        assert_eq!(buffer.staged(), b"abcdefgh");

        buffer.flush(&mut sink).unwrap();
        assert_eq!(sink.blocks, vec![(100, b"abcdefgh".to_vec())]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn non_contiguous_write_flushes_first() {
        let mut buffer = WriteBuffer::with_capacity(16).unwrap();
        let mut sink = RecordingSink::default();
        buffer.write(&mut sink, b"abcd", 0).unwrap();
        buffer.write(&mut sink, b"wxyz", 50).unwrap();
        assert_eq!(sink.blocks, vec![(0, b"abcd".to_vec())]);
        assert_eq!(buffer.base_offset(), 50);
        assert_eq!(buffer.staged(), b"wxyz");
    }

    #[test]
    fn splits_writes_larger_than_capacity() {
        let mut buffer = WriteBuffer::with_capacity(4).unwrap();
        let mut sink = RecordingSink::default();
        buffer.write(&mut sink, b"0123456789", 8).unwrap();
        assert_eq!(
            sink.blocks,
            vec![(8, b"0123".to_vec()), (12, b"4567".to_vec())]
        );
        assert_eq!(buffer.base_offset(), 16);
        assert_eq!(buffer.staged(), b"89");
        assert!(buffer.len() <= buffer.capacity());
    }

    #[test]
    fn full_buffer_flushes_on_next_write() {
        let mut buffer = WriteBuffer::with_capacity(4).unwrap();
        let mut sink = RecordingSink::default();
        buffer.write(&mut sink, b"abcd", 0).unwrap();
        assert!(buffer.is_full());
        assert!(sink.blocks.is_empty());
        buffer.write(&mut sink, b"ef", 4).unwrap();
        assert_eq!(sink.blocks, vec![(0, b"abcd".to_vec())]);
        assert_eq!(buffer.staged(), b"ef");
    }

    #[test]
    fn failed_flush_clears_buffer() {
        let mut buffer = WriteBuffer::with_capacity(8).unwrap();
        let mut sink = RecordingSink::default();
        buffer.write(&mut sink, b"abc", 0).unwrap();
        sink.fail = true;
        let err = buffer.write(&mut sink, b"xyz", 40).unwrap_err();
        assert_eq!(err.kind(), VfsErrorKind::Io);
        assert!(buffer.is_empty());

        sink.fail = false;
        buffer.flush(&mut sink).unwrap();
        assert!(sink.blocks.is_empty());
    }

    #[test]
    fn overlapping_rewrite_of_staged_range_flushes() {
        let mut buffer = WriteBuffer::with_capacity(16).unwrap();
        let mut sink = RecordingSink::default();
        buffer.write(&mut sink, b"aaaa", 0).unwrap();
        buffer.write(&mut sink, b"bb", 2).unwrap();
        assert_eq!(sink.blocks, vec![(0, b"aaaa".to_vec())]);
        assert_eq!(buffer.base_offset(), 2);
        assert_eq!(buffer.staged(), b"bb");
    }
}
