//! Frame-diff encoder producing bv streams.
//!
//! Each frame is compared against what the decoder will be showing, and
//! only damaged tiles are sent. Damaged supertiles are visited row-major;
//! the adjacency directive chains neighbours so that a move command is only
//! needed when the next damaged supertile is not adjacent.
//!
//! Input frames are one byte per pixel, non-zero meaning set; grayscale
//! sources go through [`quantize`] first. The decoder side is assumed to
//! start from an all-clear framebuffer.
//!
//! # Example
//!
//! ```
//! use bv_decoder::encoder::{build_palette, FrameEncoder};
//!
//! let mut frame = vec![0u8; 32 * 32];
//! frame[0] = 0xFF;
//! let frames = vec![frame];
//!
//! let palette = build_palette(&frames, 32, 32);
//! let mut encoder = FrameEncoder::new(32, 32, 30, palette).unwrap();
//! for frame in &frames {
//!     encoder.encode_frame(frame).unwrap();
//! }
//! let stream = encoder.finish();
//! assert!(stream.len() > 524);
//! ```

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;

use crate::decoder::{PIXEL_CLEAR, PIXEL_SET};
use crate::error::{BvError, Result};
use crate::protocol::{
    Direction, StreamHeader, MAX_MOVE_COORD, SUPERTILE_SIZE, TILESET_SIZE, TILE_SIZE,
};
use crate::writer::{StreamWriter, TileSlot};

/// Pattern of the 4x4 tile at pixel `(x, y)`; bit `tx + 4 * ty` per pixel.
pub fn tile_pattern(frame: &[u8], width: usize, x: usize, y: usize) -> u16 {
    let mut pattern = 0u16;
    for ty in 0..TILE_SIZE as usize {
        for tx in 0..TILE_SIZE as usize {
            if frame[(x + tx) + (y + ty) * width] != 0 {
                pattern |= 1 << (tx + ty * TILE_SIZE as usize);
            }
        }
    }
    pattern
}

/// Reduce an 8-bit grayscale frame to bi-level pixels (`0x00`/`0xFF`).
///
/// Bright pixels are set, mid tones are ordered-dithered:
/// - above 192: set
/// - above 128: set where `(x + y) % 2 == 0`
/// - above 98: set where `(x + 2y) % 4 == 0`
/// - otherwise clear
pub fn quantize(gray: &[u8], width: u16, height: u16) -> Vec<u8> {
    let width = width as usize;
    let size = width * height as usize;
    debug_assert!(gray.len() >= size);

    gray[..size]
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let (x, y) = (i % width, i / width);
            let set = match value {
                193..=255 => true,
                129..=192 => (x + y) % 2 == 0,
                99..=128 => (x + 2 * y) % 4 == 0,
                _ => false,
            };
            if set {
                PIXEL_SET
            } else {
                PIXEL_CLEAR
            }
        })
        .collect()
}

/// Tile grid positions (pixel coordinates) whose pattern changed.
fn damaged_tiles(prev: &[u8], next: &[u8], width: usize, height: usize) -> Vec<(usize, usize, u16)> {
    let step = TILE_SIZE as usize;
    let mut damaged = Vec::new();
    for y in (0..height).step_by(step) {
        for x in (0..width).step_by(step) {
            let before = tile_pattern(prev, width, x, y);
            let after = tile_pattern(next, width, x, y);
            if before != after {
                damaged.push((x, y, after));
            }
        }
    }
    damaged
}

/// Build a palette from the 256 most reused non-uniform damaged tiles.
///
/// Tiles are counted each time they are redrawn across the sequence,
/// starting from a blank frame. Ties are broken by pattern value.
pub fn build_palette<F: AsRef<[u8]>>(frames: &[F], width: u16, height: u16) -> [u16; TILESET_SIZE] {
    let (width, height) = (width as usize, height as usize);
    let blank = vec![0u8; width * height];
    let mut counts: HashMap<u16, usize> = HashMap::new();

    let mut prev: &[u8] = &blank;
    for frame in frames {
        let frame = frame.as_ref();
        for (_, _, pattern) in damaged_tiles(prev, frame, width, height) {
            if pattern != 0 && pattern != u16::MAX {
                *counts.entry(pattern).or_insert(0) += 1;
            }
        }
        prev = frame;
    }

    let mut ranked: Vec<(u16, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut tileset = [0u16; TILESET_SIZE];
    for (entry, (pattern, _)) in tileset.iter_mut().zip(ranked) {
        *entry = pattern;
    }
    tileset
}

/// Stateful encoder tracking what the decoder displays.
pub struct FrameEncoder {
    width: usize,
    height: usize,
    palette: HashMap<u16, u8>,
    /// Decoder-side framebuffer after the last encoded frame, 0 or 1 per pixel.
    reference: Vec<u8>,
    writer: StreamWriter,
    frames: u32,
}

impl FrameEncoder {
    /// Start a stream of `width x height` frames with `tileset` as palette.
    ///
    /// Both dimensions must be multiples of 4, and the supertile grid must
    /// be addressable by move commands (at most 512 pixels per side).
    pub fn new(width: u16, height: u16, framerate: u16, tileset: [u16; TILESET_SIZE]) -> Result<Self> {
        let max_extent = (MAX_MOVE_COORD as u32 + 1) * SUPERTILE_SIZE;
        if width as u32 % TILE_SIZE != 0 || height as u32 % TILE_SIZE != 0 {
            return Err(BvError::Encode(format!(
                "extent {}x{} is not a multiple of the {}-pixel tile",
                width, height, TILE_SIZE
            )));
        }
        if width as u32 > max_extent || height as u32 > max_extent {
            return Err(BvError::Encode(format!(
                "extent {}x{} exceeds the {}-pixel addressable range",
                width, height, max_extent
            )));
        }

        let mut palette = HashMap::new();
        for (index, pattern) in tileset.iter().enumerate().rev() {
            if *pattern != 0 && *pattern != u16::MAX {
                palette.insert(*pattern, index as u8);
            }
        }

        let header = StreamHeader::new(width, height, framerate).with_tileset(tileset);
        Ok(Self {
            width: width as usize,
            height: height as usize,
            palette,
            reference: vec![0u8; width as usize * height as usize],
            writer: StreamWriter::new(&header),
            frames: 0,
        })
    }

    /// Number of frames encoded so far.
    #[inline]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Append one frame: damaged supertiles, then a flip without pan.
    pub fn encode_frame(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() != self.width * self.height {
            return Err(BvError::Encode(format!(
                "frame holds {} pixels, expected {}",
                frame.len(),
                self.width * self.height
            )));
        }

        let st = SUPERTILE_SIZE as usize;
        let tile = TILE_SIZE as usize;

        // Row-major: key is (supertile y, supertile x).
        let mut damaged: BTreeMap<(u16, u16), [Option<TileSlot>; 16]> = BTreeMap::new();
        for (x, y, pattern) in damaged_tiles(&self.reference, frame, self.width, self.height) {
            let key = ((y / st) as u16, (x / st) as u16);
            let slot = (x % st) / tile + (y % st) / tile * 4;
            damaged.entry(key).or_insert([None; 16])[slot] = Some(self.slot_for(pattern));
        }

        let mut cursor = (0u16, 0u16);
        while !damaged.is_empty() {
            if !damaged.contains_key(&(cursor.1, cursor.0)) {
                let (&(y, x), _) = damaged.iter().next().ok_or_else(|| {
                    BvError::Encode("damaged supertile set emptied unexpectedly".to_string())
                })?;
                self.writer.move_to(x, y)?;
                cursor = (x, y);
            }

            let slots = damaged
                .remove(&(cursor.1, cursor.0))
                .unwrap_or([None; 16]);

            let direction = [Direction::Right, Direction::Left, Direction::Down, Direction::Up]
                .into_iter()
                .find(|d| {
                    let (nx, ny) = d.advance(cursor);
                    damaged.contains_key(&(ny, nx))
                })
                .unwrap_or(Direction::Right);

            self.writer.supertile(direction, &slots);
            cursor = direction.advance(cursor);
        }

        self.writer.flip(0, 0);

        for (dst, src) in self.reference.iter_mut().zip(frame) {
            *dst = (*src != 0) as u8;
        }
        self.frames += 1;
        tracing::trace!(frame = self.frames, bits = self.writer.bit_len(), "frame encoded");
        Ok(())
    }

    fn slot_for(&self, pattern: u16) -> TileSlot {
        match pattern {
            0 => TileSlot::Uniform(false),
            u16::MAX => TileSlot::Uniform(true),
            _ => match self.palette.get(&pattern) {
                Some(&index) => TileSlot::Indexed(index),
                None => TileSlot::Inline(pattern),
            },
        }
    }

    /// Finish the stream.
    pub fn finish(self) -> Bytes {
        tracing::debug!(frames = self.frames, bits = self.writer.bit_len(), "bv stream encoded");
        self.writer.finish()
    }
}
