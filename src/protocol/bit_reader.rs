//! Bit field reader over the ring buffer.
//!
//! Treats the stream as one giant little-endian integer and extracts
//! `width` bits starting at absolute bit `pos` (LSB = bit 0). Every read
//! fetches a 4-byte window from the byte containing `pos`, so a field may
//! start anywhere in that byte and still fit as long as it is at most
//! [`MAX_FIELD_WIDTH`] bits wide.

use super::ring_buffer::RingBuffer;
use super::wire_format::{MAX_FIELD_WIDTH, READ_WINDOW};
use crate::error::{BvError, Result};

/// Stateless field reader; positions are owned by the caller.
#[derive(Clone, Copy)]
pub struct BitReader<'a> {
    ring: &'a RingBuffer,
}

impl<'a> BitReader<'a> {
    /// Create a reader over `ring`.
    #[inline]
    pub fn new(ring: &'a RingBuffer) -> Self {
        Self { ring }
    }

    /// Read the `width`-bit unsigned field at absolute bit offset `pos`.
    ///
    /// Nothing is consumed: on `NeedMoreData` retry with the same `pos`
    /// after ingesting more bytes.
    ///
    /// # Errors
    ///
    /// - `FieldTooWide` if `width` is outside `1..=25`
    /// - `NeedMoreData` if the 4-byte window is not fully ingested
    /// - `StaleRead` if the window has already been overwritten
    pub fn read_bits(&self, pos: u64, width: u32) -> Result<u32> {
        if width == 0 || width > MAX_FIELD_WIDTH {
            return Err(BvError::FieldTooWide(width));
        }

        let mut window = [0u8; READ_WINDOW];
        self.ring.read_range(pos / 8, &mut window)?;

        let bits = u32::from_le_bytes(window) >> (pos % 8);
        Ok(bits & ((1u32 << width) - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(data: &[u8]) -> RingBuffer {
        let mut ring = RingBuffer::new(data.len().max(READ_WINDOW));
        ring.ingest(data, 0).unwrap();
        ring
    }

    /// Extract bits one at a time straight from the byte array.
    fn manual_bits(data: &[u8], pos: usize, width: u32) -> u32 {
        (0..width as usize).fold(0, |acc, i| {
            let bit = pos + i;
            let value = (data[bit / 8] >> (bit % 8)) as u32 & 1;
            acc | (value << i)
        })
    }

    #[test]
    fn test_matches_manual_extraction() {
        let data: Vec<u8> = (0..40u32)
            .map(|i| (i.wrapping_mul(0x9E) ^ 0x5A) as u8)
            .collect();
        let ring = ring_with(&data);
        let reader = BitReader::new(&ring);

        // Every position whose 4-byte window is fully ingested.
        let last_pos = (data.len() - READ_WINDOW) * 8 + 7;
        for pos in 0..=last_pos {
            for width in 1..=MAX_FIELD_WIDTH {
                assert_eq!(
                    reader.read_bits(pos as u64, width).unwrap(),
                    manual_bits(&data, pos, width),
                    "pos {} width {}",
                    pos,
                    width
                );
            }
        }
    }

    #[test]
    fn test_field_spanning_byte_boundary() {
        let ring = ring_with(&[0b1100_0000, 0b0000_0011, 0, 0]);
        let reader = BitReader::new(&ring);
        assert_eq!(reader.read_bits(6, 4).unwrap(), 0b1111);
        assert_eq!(reader.read_bits(5, 6).unwrap(), 0b011110);
    }

    #[test]
    fn test_width_limits() {
        let ring = ring_with(&[0xFF; 8]);
        let reader = BitReader::new(&ring);

        assert!(matches!(reader.read_bits(0, 0), Err(BvError::FieldTooWide(0))));
        assert!(matches!(reader.read_bits(0, 26), Err(BvError::FieldTooWide(26))));
        assert_eq!(reader.read_bits(7, 25).unwrap(), (1 << 25) - 1);
    }

    #[test]
    fn test_needs_full_window() {
        let mut ring = RingBuffer::new(16);
        ring.ingest(&[0xAB, 0xCD, 0xEF], 0).unwrap();
        let result = BitReader::new(&ring).read_bits(0, 2);
        assert!(matches!(result, Err(BvError::NeedMoreData)));

        ring.ingest(&[0x01], 0).unwrap();
        assert_eq!(BitReader::new(&ring).read_bits(0, 8).unwrap(), 0xAB);
    }

    #[test]
    fn test_single_bit_reads() {
        let ring = ring_with(&[0b0000_0100, 0, 0, 0]);
        let reader = BitReader::new(&ring);
        assert_eq!(reader.read_bits(1, 1).unwrap(), 0);
        assert_eq!(reader.read_bits(2, 1).unwrap(), 1);
    }

    #[test]
    fn test_reads_across_ring_wrap() {
        let mut ring = RingBuffer::new(8);
        ring.ingest(&[0; 6], 0).unwrap();
        ring.ingest(&[0x34, 0x12, 0x78, 0x56], 6).unwrap();

        let reader = BitReader::new(&ring);
        assert_eq!(reader.read_bits(6 * 8, 16).unwrap(), 0x1234);
        assert_eq!(reader.read_bits(6 * 8 + 4, 12).unwrap(), 0x123);
    }
}
