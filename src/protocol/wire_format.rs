//! Wire format encoding and decoding.
//!
//! A bv stream is a fixed 524-byte header followed by a variable-bit-width
//! command stream:
//! ```text
//! ┌──────────┬──────────┬──────────┬───────────┬──────────────────────┐
//! │ Magic    │ Width    │ Height   │ Framerate │ Tileset              │
//! │ 6 bytes  │ uint16 LE│ uint16 LE│ uint16 LE │ 256 x uint16 LE      │
//! └──────────┴──────────┴──────────┴───────────┴──────────────────────┘
//! ```
//!
//! Commands are read as a little-endian bit sequence: bit 0 of byte N is
//! the least significant bit, and multi-bit fields are packed LSB first.
//!
//! ```text
//! supertile  1 | dir:2 | mask:16 | slot...          (tag bit0 = 1)
//! move       0 1 | x:5 | y:5                        (12 bits)
//! flip       0 0 | dx:i8 | dy:i8                    (18 bits, ends frame)
//!
//! slot       1 p                 uniform fill, p = polarity
//!            0 1 | index:8       palette tile
//!            0 0 | pattern:16    inline tile
//! ```

use serde::Serialize;

use crate::error::{BvError, Result};

/// Stream magic, the first six bytes of every bv stream.
pub const MAGIC: [u8; MAGIC_SIZE] = *b"BitV\0\0";

/// Magic size in bytes.
pub const MAGIC_SIZE: usize = 6;

/// Number of entries in the tile palette.
pub const TILESET_SIZE: usize = 256;

/// Header size in bytes (fixed, exactly 524).
pub const HEADER_SIZE: usize = MAGIC_SIZE + 3 * 2 + TILESET_SIZE * 2;

/// Header size in bits, the bit head position of the first command.
pub const HEADER_BITS: u64 = HEADER_SIZE as u64 * 8;

/// Default ring buffer capacity in bytes.
pub const DEFAULT_RING_CAPACITY: usize = 2048;

/// Bytes fetched per bit field read.
pub const READ_WINDOW: usize = 4;

/// Widest field that always fits the 4-byte window after a 7-bit misalignment.
pub const MAX_FIELD_WIDTH: u32 = 32 - 7;

/// Edge length of a tile in pixels.
pub const TILE_SIZE: u32 = 4;

/// Edge length of a supertile in pixels (4x4 tiles).
pub const SUPERTILE_SIZE: u32 = TILE_SIZE * 4;

/// Largest cursor coordinate a move command can address.
pub const MAX_MOVE_COORD: u16 = 31;

/// Field widths of the command stream.
pub mod widths {
    /// Command tag.
    pub const TAG: u32 = 2;
    /// Bits a supertile command tag actually consumes.
    pub const SUPERTILE_TAG: u32 = 1;
    /// Adjacency direction + coverage mask.
    pub const SUPERTILE_PREFIX: u32 = 18;
    /// Move command payload (x:5, y:5).
    pub const MOVE: u32 = 10;
    /// Single move coordinate.
    pub const MOVE_COORD: u32 = 5;
    /// Flip command payload (dx:8, dy:8).
    pub const FLIP: u32 = 16;
    /// Slot type tag.
    pub const SLOT_TAG: u32 = 2;
    /// Palette index.
    pub const INDEX: u32 = 8;
    /// Inline tile pattern.
    pub const PATTERN: u32 = 16;
}

/// Tag bit constants, shared by command and slot tags.
pub mod tags {
    /// Bit 0 of a command tag: supertile command.
    pub const SUPERTILE: u32 = 0b01;
    /// Bit 1 of a command tag (bit 0 clear): move command.
    pub const MOVE: u32 = 0b10;
    /// Both bits clear: flip command.
    pub const FLIP: u32 = 0b00;

    /// Bit 0 of a slot tag: uniform tile.
    pub const UNIFORM: u32 = 0b01;
    /// Bit 1 of a uniform slot tag: fill polarity.
    pub const POLARITY: u32 = 0b10;
    /// Bit 1 of a non-uniform slot tag: palette-indexed tile.
    pub const INDEXED: u32 = 0b10;

    /// Check if a specific tag bit is set.
    #[inline]
    pub fn has_bit(tag: u32, bit: u32) -> bool {
        tag & bit != 0
    }
}

/// Top-level command kinds of the frame body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Supertile,
    Move,
    Flip,
}

impl CommandKind {
    /// Classify a 2-bit command tag.
    #[inline]
    pub fn from_tag(tag: u32) -> Self {
        if tags::has_bit(tag, tags::SUPERTILE) {
            CommandKind::Supertile
        } else if tags::has_bit(tag, tags::MOVE) {
            CommandKind::Move
        } else {
            CommandKind::Flip
        }
    }
}

/// Tile slot kinds inside a supertile command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Whole tile set (`true`) or cleared (`false`).
    Uniform(bool),
    Indexed,
    Inline,
}

impl SlotKind {
    /// Classify a 2-bit slot tag.
    #[inline]
    pub fn from_tag(tag: u32) -> Self {
        if tags::has_bit(tag, tags::UNIFORM) {
            SlotKind::Uniform(tags::has_bit(tag, tags::POLARITY))
        } else if tags::has_bit(tag, tags::INDEXED) {
            SlotKind::Indexed
        } else {
            SlotKind::Inline
        }
    }
}

/// Cursor adjacency directive carried by every supertile command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// +x
    Right,
    /// +y
    Down,
    /// -x
    Left,
    /// -y
    Up,
}

impl Direction {
    /// Decode the low 2 bits of a supertile prefix.
    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Direction::Right,
            1 => Direction::Down,
            2 => Direction::Left,
            _ => Direction::Up,
        }
    }

    /// Encode as the 2-bit wire value.
    #[inline]
    pub fn bits(self) -> u32 {
        match self {
            Direction::Right => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Up => 3,
        }
    }

    /// Apply the directive to a supertile cursor. Wraps like the u16 cursor
    /// of the reference hardware decoder.
    #[inline]
    pub fn advance(self, cursor: (u16, u16)) -> (u16, u16) {
        let (x, y) = cursor;
        match self {
            Direction::Right => (x.wrapping_add(1), y),
            Direction::Down => (x, y.wrapping_add(1)),
            Direction::Left => (x.wrapping_sub(1), y),
            Direction::Up => (x, y.wrapping_sub(1)),
        }
    }
}

/// Decoded stream header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Frame width in pixels.
    pub width: u16,
    /// Frame height in pixels.
    pub height: u16,
    /// Frames per second, informational only.
    pub framerate: u16,
    /// 4x4 tile patterns referenced by indexed slots.
    pub tileset: [u16; TILESET_SIZE],
}

impl StreamHeader {
    /// Create a new header with an all-zero palette.
    pub fn new(width: u16, height: u16, framerate: u16) -> Self {
        Self {
            width,
            height,
            framerate,
            tileset: [0; TILESET_SIZE],
        }
    }

    /// Replace the palette.
    pub fn with_tileset(mut self, tileset: [u16; TILESET_SIZE]) -> Self {
        self.tileset = tileset;
        self
    }

    /// Framebuffer size in bytes, one byte per pixel.
    #[inline]
    pub fn framebuffer_size(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Encode header to bytes.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (524 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..6].copy_from_slice(&MAGIC);
        buf[6..8].copy_from_slice(&self.width.to_le_bytes());
        buf[8..10].copy_from_slice(&self.height.to_le_bytes());
        buf[10..12].copy_from_slice(&self.framerate.to_le_bytes());
        for (i, tile) in self.tileset.iter().enumerate() {
            let at = 12 + i * 2;
            buf[at..at + 2].copy_from_slice(&tile.to_le_bytes());
        }
    }

    /// Decode header from bytes.
    ///
    /// Returns `NeedMoreData` if the buffer is too short and `InvalidMagic`
    /// if it does not start with [`MAGIC`].
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(BvError::NeedMoreData);
        }

        let mut magic = [0u8; MAGIC_SIZE];
        magic.copy_from_slice(&buf[..MAGIC_SIZE]);
        if magic != MAGIC {
            return Err(BvError::InvalidMagic(magic));
        }

        let mut tileset = [0u16; TILESET_SIZE];
        for (i, tile) in tileset.iter_mut().enumerate() {
            let at = 12 + i * 2;
            *tile = u16::from_le_bytes([buf[at], buf[at + 1]]);
        }

        Ok(Self {
            width: u16::from_le_bytes([buf[6], buf[7]]),
            height: u16::from_le_bytes([buf[8], buf[9]]),
            framerate: u16::from_le_bytes([buf[10], buf[11]]),
            tileset,
        })
    }

    /// Summary without the palette.
    pub fn info(&self) -> StreamInfo {
        StreamInfo {
            width: self.width,
            height: self.height,
            framerate: self.framerate,
            framebuffer_size: self.framebuffer_size(),
        }
    }
}

/// Header summary for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamInfo {
    pub width: u16,
    pub height: u16,
    pub framerate: u16,
    pub framebuffer_size: usize,
}

/// Sign-extend the two 8-bit halves of a flip payload into (dx, dy).
#[inline]
pub fn split_flip(bits: u32) -> (i8, i8) {
    let dx = (bits & 0xFF) as u8 as i8;
    let dy = ((bits >> 8) & 0xFF) as u8 as i8;
    (dx, dy)
}

/// Split a move payload into absolute cursor (x, y).
#[inline]
pub fn split_move(bits: u32) -> (u16, u16) {
    let x = (bits & 0x1F) as u16;
    let y = ((bits >> widths::MOVE_COORD) & 0x1F) as u16;
    (x, y)
}
