//! Protocol module - wire format, ring buffer, and bit field reads.
//!
//! This module implements the byte and bit plumbing of a bv stream:
//! - 524-byte header encoding/decoding and command tag layout
//! - Ring buffer holding the ingested window of the stream
//! - Bit reader extracting little-endian fields at absolute bit offsets

mod bit_reader;
mod ring_buffer;
mod wire_format;

pub use bit_reader::BitReader;
pub use ring_buffer::RingBuffer;
pub use wire_format::{
    split_flip, split_move, tags, widths, CommandKind, Direction, SlotKind, StreamHeader,
    StreamInfo, DEFAULT_RING_CAPACITY, HEADER_BITS, HEADER_SIZE, MAGIC, MAGIC_SIZE,
    MAX_FIELD_WIDTH, MAX_MOVE_COORD, READ_WINDOW, SUPERTILE_SIZE, TILESET_SIZE, TILE_SIZE,
};
