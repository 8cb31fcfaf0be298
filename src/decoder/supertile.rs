//! Supertile command decoding.
//!
//! A supertile covers a 16x16 pixel block at the tile cursor, split into a
//! 4x4 grid of tile slots. The command carries an adjacency direction, a
//! 16-bit coverage mask (bit `tx + 4 * ty`), and one slot record per
//! covered slot in mask order.

use super::framebuffer::{FrameView, PIXEL_CLEAR, PIXEL_SET};
use crate::error::Result;
use crate::protocol::{
    widths, BitReader, Direction, SlotKind, SUPERTILE_SIZE, TILESET_SIZE, TILE_SIZE,
};

/// Slots per supertile.
pub const SLOTS_PER_SUPERTILE: u32 = 16;

/// Outcome of a fully decoded supertile, not yet committed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Supertile {
    /// Bit offset one past the last consumed bit.
    pub end: u64,
    /// Where the cursor moves once the command is committed.
    pub direction: Direction,
    /// Number of covered slots drawn.
    pub slots: u32,
}

/// Decode one supertile whose prefix starts at absolute bit `start`.
///
/// Pixels of slots drawn before a `NeedMoreData` stay written; a retry
/// re-derives identical values for them, so only the bit head and cursor
/// need to stay untouched, which is the caller's job.
pub(crate) fn decode_supertile(
    reader: &BitReader<'_>,
    start: u64,
    cursor: (u16, u16),
    tileset: &[u16; TILESET_SIZE],
    view: &mut FrameView<'_>,
) -> Result<Supertile> {
    let mut head = start;

    let prefix = reader.read_bits(head, widths::SUPERTILE_PREFIX)?;
    head += widths::SUPERTILE_PREFIX as u64;

    let direction = Direction::from_bits(prefix);
    let coverage = prefix >> 2;

    let base_x = cursor.0 as u32 * SUPERTILE_SIZE;
    let base_y = cursor.1 as u32 * SUPERTILE_SIZE;
    let mut slots = 0;

    for slot in 0..SLOTS_PER_SUPERTILE {
        if (coverage >> slot) & 1 == 0 {
            continue;
        }

        let x = base_x + (slot % 4) * TILE_SIZE;
        let y = base_y + (slot / 4) * TILE_SIZE;

        let tag = reader.read_bits(head, widths::SLOT_TAG)?;
        match SlotKind::from_tag(tag) {
            SlotKind::Uniform(polarity) => {
                let value = if polarity { PIXEL_SET } else { PIXEL_CLEAR };
                view.fill_tile(x, y, value)?;
                head += widths::SLOT_TAG as u64;
            }
            SlotKind::Indexed => {
                let index = reader.read_bits(head + widths::SLOT_TAG as u64, widths::INDEX)?;
                view.blit_tile(x, y, tileset[index as usize])?;
                head += (widths::SLOT_TAG + widths::INDEX) as u64;
            }
            SlotKind::Inline => {
                let pattern =
                    reader.read_bits(head + widths::SLOT_TAG as u64, widths::PATTERN)?;
                view.blit_tile(x, y, pattern as u16)?;
                head += (widths::SLOT_TAG + widths::PATTERN) as u64;
            }
        }
        slots += 1;
    }

    Ok(Supertile {
        end: head,
        direction,
        slots,
    })
}
