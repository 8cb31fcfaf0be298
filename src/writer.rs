//! Bitstream writer for building bv streams.
//!
//! The inverse of the decoder: [`BitWriter`] packs little-endian bit fields
//! and [`StreamWriter`] lays out a header followed by supertile, move, and
//! flip commands.
//!
//! # Example
//!
//! ```
//! use bv_decoder::protocol::{Direction, StreamHeader};
//! use bv_decoder::writer::{StreamWriter, TileSlot};
//!
//! let mut slots = [None; 16];
//! slots[0] = Some(TileSlot::Uniform(true));
//!
//! let mut writer = StreamWriter::new(&StreamHeader::new(32, 32, 30));
//! writer.supertile(Direction::Right, &slots).flip(0, 0);
//! let stream = writer.finish();
//! assert!(stream.len() > 524);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BvError, Result};
use crate::protocol::{
    tags, widths, Direction, StreamHeader, HEADER_SIZE, MAX_MOVE_COORD, READ_WINDOW,
};

/// One explicit tile update inside a supertile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSlot {
    /// Solid tile; `true` sets every pixel.
    Uniform(bool),
    /// Palette entry index.
    Indexed(u8),
    /// Literal 16-bit pattern, bit `x + 4 * y` per pixel.
    Inline(u16),
}

impl TileSlot {
    /// Bits this slot occupies in the stream.
    pub fn bit_len(&self) -> u32 {
        match self {
            TileSlot::Uniform(_) => widths::SLOT_TAG,
            TileSlot::Indexed(_) => widths::SLOT_TAG + widths::INDEX,
            TileSlot::Inline(_) => widths::SLOT_TAG + widths::PATTERN,
        }
    }
}

/// Little-endian bit packer.
///
/// Also tracks how far the decoder's 4-byte read windows reach, so a
/// finished stream can be padded exactly enough for its last field.
#[derive(Debug, Default)]
pub struct BitWriter {
    buf: BytesMut,
    bit_len: u64,
    window_end: u64,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            bit_len: 0,
            window_end: 0,
        }
    }

    /// Bits written so far.
    #[inline]
    pub fn bit_len(&self) -> u64 {
        self.bit_len
    }

    /// Append the low `width` bits of `value`, LSB first.
    ///
    /// The field is recorded as one decoder read starting at the current
    /// position.
    pub fn write_bits(&mut self, value: u32, width: u32) {
        debug_assert!(width <= 32);
        self.window_end = self.window_end.max(self.bit_len / 8 + READ_WINDOW as u64);

        for i in 0..width {
            let shift = (self.bit_len % 8) as u32;
            if shift == 0 {
                self.buf.put_u8(0);
            }
            let bit = ((value >> i) & 1) as u8;
            let last = self.buf.len() - 1;
            self.buf[last] |= bit << shift;
            self.bit_len += 1;
        }
    }

    /// Append whole bytes. The writer must be byte-aligned.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.bit_len % 8, 0);
        self.buf.extend_from_slice(bytes);
        self.bit_len += bytes.len() as u64 * 8;
    }

    /// Supertile prefix and slots, without the leading tag bit.
    pub fn write_supertile_body(&mut self, direction: Direction, slots: &[Option<TileSlot>; 16]) {
        let coverage = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .fold(0u32, |mask, (i, _)| mask | (1 << i));
        self.write_bits(direction.bits() | (coverage << 2), widths::SUPERTILE_PREFIX);

        for slot in slots.iter().flatten() {
            match *slot {
                TileSlot::Uniform(polarity) => {
                    let polarity = if polarity { tags::POLARITY } else { 0 };
                    self.write_bits(tags::UNIFORM | polarity, widths::SLOT_TAG);
                }
                TileSlot::Indexed(index) => {
                    self.write_bits(tags::INDEXED, widths::SLOT_TAG);
                    self.write_bits(index as u32, widths::INDEX);
                }
                TileSlot::Inline(pattern) => {
                    self.write_bits(0, widths::SLOT_TAG);
                    self.write_bits(pattern as u32, widths::PATTERN);
                }
            }
        }
    }

    /// Full supertile command.
    pub fn write_supertile(&mut self, direction: Direction, slots: &[Option<TileSlot>; 16]) {
        self.write_bits(tags::SUPERTILE, widths::SUPERTILE_TAG);
        self.write_supertile_body(direction, slots);
    }

    /// Absolute cursor move; coordinates are 5-bit.
    pub fn write_move(&mut self, x: u16, y: u16) -> Result<()> {
        if x > MAX_MOVE_COORD || y > MAX_MOVE_COORD {
            return Err(BvError::Encode(format!(
                "move target ({}, {}) exceeds {}",
                x, y, MAX_MOVE_COORD
            )));
        }
        self.write_bits(tags::MOVE, widths::TAG);
        self.write_bits(x as u32 | (y as u32) << widths::MOVE_COORD, widths::MOVE);
        Ok(())
    }

    /// Frame-terminating flip with a viewport pan.
    pub fn write_flip(&mut self, dx: i8, dy: i8) {
        self.write_bits(tags::FLIP, widths::TAG);
        self.write_bits(dx as u8 as u32 | (dy as u8 as u32) << 8, widths::FLIP);
    }

    /// Written bytes; a trailing partial byte is zero-filled.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Written bytes, zero-padded so every recorded field read is satisfiable.
    pub fn into_padded_bytes(mut self) -> Bytes {
        let target = self.window_end as usize;
        if self.buf.len() < target {
            self.buf.resize(target, 0);
        }
        self.buf.freeze()
    }
}

/// Header plus command stream builder.
#[derive(Debug)]
pub struct StreamWriter {
    bits: BitWriter,
}

impl StreamWriter {
    /// Start a stream with `header`.
    pub fn new(header: &StreamHeader) -> Self {
        let mut bits = BitWriter::with_capacity(HEADER_SIZE * 2);
        bits.write_bytes(&header.encode());
        Self { bits }
    }

    /// Append a supertile command.
    pub fn supertile(&mut self, direction: Direction, slots: &[Option<TileSlot>; 16]) -> &mut Self {
        self.bits.write_supertile(direction, slots);
        self
    }

    /// Append a move command.
    pub fn move_to(&mut self, x: u16, y: u16) -> Result<&mut Self> {
        self.bits.write_move(x, y)?;
        Ok(self)
    }

    /// Append a flip command, ending the current frame.
    pub fn flip(&mut self, dx: i8, dy: i8) -> &mut Self {
        self.bits.write_flip(dx, dy);
        self
    }

    /// Bits written so far, header included.
    #[inline]
    pub fn bit_len(&self) -> u64 {
        self.bits.bit_len()
    }

    /// Finish the stream, padded so its last command can be decoded and
    /// no further command can be.
    pub fn finish(self) -> Bytes {
        self.bits.into_padded_bytes()
    }
}
