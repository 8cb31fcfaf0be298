//! Framebuffer slots and the tile-level pixel view the decoder draws into.
//!
//! Framebuffers are owned by the caller and handed over at bind time, one
//! byte per pixel (`0x00` or `0xFF`). The slot set accepts up to two
//! buffers but only slot 0 is ever active; rotating slots per frame for
//! double buffering would hook in at [`FramebufferSet::active_index`].

use crate::error::{BvError, Result};
use crate::protocol::TILE_SIZE;

/// Maximum framebuffer slots a session accepts.
pub const FRAMEBUFFER_SLOTS: usize = 2;

/// Pixel value of a set bit.
pub const PIXEL_SET: u8 = 0xFF;

/// Pixel value of a clear bit.
pub const PIXEL_CLEAR: u8 = 0x00;

/// Expand a 16-bit tile pattern into 4x4 pixels, row-major.
///
/// Bit `x + 4 * y` of the pattern is pixel `(x, y)`.
#[inline]
pub fn expand_tile(pattern: u16) -> [u8; 16] {
    let mut pixels = [PIXEL_CLEAR; 16];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        if (pattern >> i) & 1 != 0 {
            *pixel = PIXEL_SET;
        }
    }
    pixels
}

/// Externally owned framebuffers bound to a session.
pub struct FramebufferSet<B> {
    slots: Vec<B>,
    active: usize,
    frame_size: usize,
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> FramebufferSet<B> {
    /// Take ownership of `slots`, each of which must hold `frame_size` bytes.
    pub fn new(slots: Vec<B>, frame_size: usize) -> Result<Self> {
        if slots.is_empty() || slots.len() > FRAMEBUFFER_SLOTS {
            return Err(BvError::InvalidConfig(format!(
                "expected 1 to {} framebuffer slots, got {}",
                FRAMEBUFFER_SLOTS,
                slots.len()
            )));
        }

        for (slot, fb) in slots.iter().enumerate() {
            let len = fb.as_ref().len();
            if len < frame_size {
                return Err(BvError::FramebufferTooSmall {
                    slot,
                    len,
                    required: frame_size,
                });
            }
        }

        Ok(Self {
            slots,
            active: 0,
            frame_size,
        })
    }

    /// Index of the slot currently being decoded into and displayed.
    #[inline]
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Number of bound slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; a bound set holds at least one slot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pixels of the active slot, exactly one frame long.
    #[inline]
    pub fn active(&self) -> &[u8] {
        &self.slots[self.active].as_ref()[..self.frame_size]
    }

    /// Mutable pixels of the active slot.
    #[inline]
    pub fn active_mut(&mut self) -> &mut [u8] {
        &mut self.slots[self.active].as_mut()[..self.frame_size]
    }

    /// Pixels of slot `index`, if bound.
    pub fn slot(&self, index: usize) -> Option<&[u8]> {
        self.slots
            .get(index)
            .map(|fb| &fb.as_ref()[..self.frame_size])
    }

    /// Hand the buffers back to the caller.
    pub fn into_slots(self) -> Vec<B> {
        self.slots
    }
}

/// Width/height-aware view of one framebuffer.
pub struct FrameView<'a> {
    pixels: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> FrameView<'a> {
    /// Wrap `pixels`, which must hold at least `width * height` bytes.
    pub fn new(pixels: &'a mut [u8], width: u16, height: u16) -> Self {
        debug_assert!(pixels.len() >= width as usize * height as usize);
        Self {
            pixels,
            width: width as u32,
            height: height as u32,
        }
    }

    /// Fill the 4x4 tile whose top-left pixel is `(x, y)`.
    pub fn fill_tile(&mut self, x: u32, y: u32, value: u8) -> Result<()> {
        self.check_tile(x, y)?;
        for row in 0..TILE_SIZE {
            let start = self.index(x, y + row);
            self.pixels[start..start + TILE_SIZE as usize].fill(value);
        }
        Ok(())
    }

    /// Draw a 16-bit tile pattern with its top-left pixel at `(x, y)`.
    pub fn blit_tile(&mut self, x: u32, y: u32, pattern: u16) -> Result<()> {
        self.check_tile(x, y)?;
        let pixels = expand_tile(pattern);
        for (row, chunk) in pixels.chunks_exact(TILE_SIZE as usize).enumerate() {
            let start = self.index(x, y + row as u32);
            self.pixels[start..start + TILE_SIZE as usize].copy_from_slice(chunk);
        }
        Ok(())
    }

    /// Pan the view contents in place, see [`super::shift::shift`].
    pub fn shift(&mut self, dx: i8, dy: i8) {
        super::shift::shift(
            self.pixels,
            self.width as usize,
            self.height as usize,
            dx,
            dy,
        );
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        x as usize + y as usize * self.width as usize
    }

    fn check_tile(&self, x: u32, y: u32) -> Result<()> {
        if x + TILE_SIZE > self.width || y + TILE_SIZE > self.height {
            return Err(BvError::TileOutOfBounds { x, y });
        }
        Ok(())
    }
}
