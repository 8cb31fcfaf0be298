//! Ring buffer holding the most recently ingested window of the stream.
//!
//! The stream is addressed by absolute byte offsets that grow for the life
//! of the session. Physically the bytes live in a fixed-capacity slice and
//! wrap modulo its length:
//!
//! ```text
//!  absolute:  ... | retained ........ head |
//!  physical:  [ 5 6 7 | 0 1 2 3 4 ]            head % capacity == 3
//! ```
//!
//! The ring never evicts implicitly and never blocks. A read past the head
//! reports `NeedMoreData`; an ingest that would wrap onto bytes the
//! decoder has not consumed yet reports `Overwrite`.

use crate::error::{BvError, Result};

/// Fixed-capacity circular byte window with monotonic head accounting.
pub struct RingBuffer {
    /// Physical storage.
    buf: Box<[u8]>,
    /// Absolute offset of the next byte slot to write.
    head: u64,
}

impl RingBuffer {
    /// Create a ring buffer holding `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
        }
    }

    /// Capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Absolute offset one past the last ingested byte.
    #[inline]
    pub fn head(&self) -> u64 {
        self.head
    }

    /// Number of bytes that can be ingested without clobbering anything at
    /// or after the absolute offset `retained`.
    #[inline]
    pub fn available(&self, retained: u64) -> usize {
        let limit = retained + self.capacity() as u64;
        limit.saturating_sub(self.head) as usize
    }

    /// Append `data` at the head, wrapping physically at capacity.
    ///
    /// `retained` is the absolute offset of the oldest byte still needed.
    /// Fails with `Overwrite`, leaving the head untouched, when the new
    /// bytes would land on it.
    pub fn ingest(&mut self, data: &[u8], retained: u64) -> Result<()> {
        let capacity = self.capacity() as u64;
        let end = self.head + data.len() as u64;

        if data.len() as u64 > capacity || end - end.min(capacity) > retained {
            return Err(BvError::Overwrite {
                buffer_head: self.head,
                len: data.len(),
                retained,
            });
        }

        let start = (self.head % capacity) as usize;
        let first = data.len().min(self.buf.len() - start);
        self.buf[start..start + first].copy_from_slice(&data[..first]);
        self.buf[..data.len() - first].copy_from_slice(&data[first..]);

        self.head = end;
        Ok(())
    }

    /// Copy `out.len()` bytes starting at absolute `offset` into `out`.
    ///
    /// Returns:
    /// - `Ok(())` if the range is fully held
    /// - `Err(NeedMoreData)` if it reaches past the head
    /// - `Err(StaleRead)` if part of it was already overwritten
    pub fn read_range(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let capacity = self.capacity() as u64;

        if offset + out.len() as u64 > self.head {
            return Err(BvError::NeedMoreData);
        }

        if offset + capacity < self.head {
            return Err(BvError::StaleRead {
                offset,
                buffer_head: self.head,
            });
        }

        let start = (offset % capacity) as usize;
        let first = out.len().min(self.buf.len() - start);
        let len = out.len();
        out[..first].copy_from_slice(&self.buf[start..start + first]);
        out[first..].copy_from_slice(&self.buf[..len - first]);
        Ok(())
    }
}
