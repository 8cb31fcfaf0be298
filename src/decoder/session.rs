//! Decode session: the per-stream state machine.
//!
//! A session is created once, fed bytes with [`Session::ingest`], configured
//! from the stream header once, bound to caller-owned framebuffers once,
//! and then driven by repeated [`Session::decode_frame`] calls.
//!
//! Every command commits on success only. When data runs out mid-command
//! the call returns `NeedMoreData` and the bit head, cursor, and frame
//! index stay exactly where the last fully decoded command left them, so
//! the caller ingests more bytes and calls again.
//!
//! # Example
//!
//! ```
//! use bv_decoder::decoder::Session;
//! use bv_decoder::protocol::{Direction, StreamHeader};
//! use bv_decoder::writer::{StreamWriter, TileSlot};
//!
//! let mut slots = [None; 16];
//! slots[0] = Some(TileSlot::Uniform(true));
//! let mut writer = StreamWriter::new(&StreamHeader::new(32, 32, 30));
//! writer.supertile(Direction::Right, &slots).flip(0, 0);
//! let stream = writer.finish();
//!
//! let mut session = Session::new();
//! session.ingest(&stream).unwrap();
//! session.configure().unwrap();
//! let size = session.info().unwrap().framebuffer_size;
//! session.bind(vec![vec![0u8; size]]).unwrap();
//!
//! session.decode_frame().unwrap();
//! assert_eq!(session.frame_index(), 1);
//! assert_eq!(session.active_framebuffer().unwrap()[0], 0xFF);
//! ```

use serde::Serialize;

use super::framebuffer::{FrameView, FramebufferSet};
use super::supertile::decode_supertile;
use crate::error::{BvError, Result};
use crate::protocol::{
    split_flip, split_move, widths, BitReader, CommandKind, RingBuffer, StreamHeader, StreamInfo,
    DEFAULT_RING_CAPACITY, HEADER_BITS, HEADER_SIZE,
};

/// Configuration for a decode session.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Ring buffer capacity in bytes. Must hold at least the header.
    pub ring_capacity: usize,
}

impl DecoderConfig {
    /// Set the ring buffer capacity.
    ///
    /// Default: 2048 bytes
    pub fn ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }

    /// Check the configuration for values the decoder cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.ring_capacity < HEADER_SIZE {
            return Err(BvError::InvalidConfig(format!(
                "ring capacity {} is smaller than the {}-byte header",
                self.ring_capacity, HEADER_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
        }
    }
}

/// Snapshot of session progress for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub buffer_head: u64,
    pub bit_head: u64,
    pub frame_index: u32,
    pub cursor: (u16, u16),
}

/// Streaming decoder state for one bv stream.
pub struct Session<B = Vec<u8>> {
    ring: RingBuffer,
    header: Option<StreamHeader>,
    framebuffers: Option<FramebufferSet<B>>,
    /// Supertile grid coordinate being drawn.
    cursor: (u16, u16),
    /// Absolute offset of the next unconsumed bit.
    bit_head: u64,
    frame_index: u32,
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Session<B> {
    /// Create a session with the default 2048-byte ring buffer.
    pub fn new() -> Self {
        Self::from_ring(RingBuffer::new(DEFAULT_RING_CAPACITY))
    }

    /// Create a session with custom configuration.
    pub fn with_config(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_ring(RingBuffer::new(config.ring_capacity)))
    }

    fn from_ring(ring: RingBuffer) -> Self {
        Self {
            ring,
            header: None,
            framebuffers: None,
            cursor: (0, 0),
            bit_head: 0,
            frame_index: 0,
        }
    }

    /// Push more stream bytes.
    ///
    /// # Errors
    ///
    /// Returns `Overwrite` (fatal) if the bytes would wrap onto data the
    /// decoder has not consumed yet; see [`Session::ingest_budget`].
    pub fn ingest(&mut self, data: &[u8]) -> Result<()> {
        let retained = self.bit_head / 8;
        if let Err(e) = self.ring.ingest(data, retained) {
            tracing::error!("Ingest rejected: {}", e);
            return Err(e);
        }
        tracing::trace!(
            len = data.len(),
            buffer_head = self.ring.head(),
            "ingested stream bytes"
        );
        Ok(())
    }

    /// Bytes that can be ingested right now without an overwrite.
    #[inline]
    pub fn ingest_budget(&self) -> usize {
        self.ring.available(self.bit_head / 8)
    }

    /// Parse the stream header at byte 0.
    ///
    /// Returns `NeedMoreData` until all 524 header bytes are ingested.
    pub fn configure(&mut self) -> Result<()> {
        if self.header.is_some() {
            return Err(BvError::AlreadyConfigured);
        }

        let mut raw = [0u8; HEADER_SIZE];
        self.ring.read_range(0, &mut raw)?;
        let header = StreamHeader::decode(&raw).map_err(|e| {
            tracing::error!("Header rejected: {}", e);
            e
        })?;

        tracing::debug!(
            width = header.width,
            height = header.height,
            framerate = header.framerate,
            framebuffer_size = header.framebuffer_size(),
            "bv stream configured"
        );

        self.bit_head += HEADER_BITS;
        self.header = Some(header);
        Ok(())
    }

    /// Attach caller-owned framebuffers (one or two slots, each at least
    /// [`StreamInfo::framebuffer_size`] bytes). Only slot 0 is drawn into.
    pub fn bind(&mut self, slots: impl IntoIterator<Item = B>) -> Result<()> {
        let header = self.header.as_ref().ok_or(BvError::NotConfigured)?;
        if self.framebuffers.is_some() {
            return Err(BvError::AlreadyBound);
        }

        let set = FramebufferSet::new(slots.into_iter().collect(), header.framebuffer_size())?;
        tracing::debug!(slots = set.len(), "framebuffers bound");
        self.framebuffers = Some(set);
        Ok(())
    }

    /// Decode commands until a flip ends the frame.
    ///
    /// # Errors
    ///
    /// - `NeedMoreData`: ingest more bytes and call again; progress up to
    ///   the last complete command is kept
    /// - anything else is fatal for the session
    pub fn decode_frame(&mut self) -> Result<()> {
        match self.decode_commands() {
            Err(e) if e.is_fatal() => {
                tracing::error!(bit_head = self.bit_head, "Frame decode failed: {}", e);
                Err(e)
            }
            other => other,
        }
    }

    /// Like [`Session::decode_frame`] but reports `NeedMoreData` as
    /// `Ok(None)` and success as the new frame index.
    pub fn try_decode_frame(&mut self) -> Result<Option<u32>> {
        match self.decode_frame() {
            Ok(()) => Ok(Some(self.frame_index)),
            Err(BvError::NeedMoreData) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn decode_commands(&mut self) -> Result<()> {
        let header = self.header.as_ref().ok_or(BvError::NotConfigured)?;
        let framebuffers = self.framebuffers.as_mut().ok_or(BvError::NotBound)?;
        let reader = BitReader::new(&self.ring);

        loop {
            let tag = reader.read_bits(self.bit_head, widths::TAG)?;

            match CommandKind::from_tag(tag) {
                CommandKind::Supertile => {
                    let mut view =
                        FrameView::new(framebuffers.active_mut(), header.width, header.height);
                    let st = decode_supertile(
                        &reader,
                        self.bit_head + widths::SUPERTILE_TAG as u64,
                        self.cursor,
                        &header.tileset,
                        &mut view,
                    )?;

                    tracing::trace!(
                        cursor = ?self.cursor,
                        slots = st.slots,
                        direction = ?st.direction,
                        "supertile"
                    );
                    self.bit_head = st.end;
                    self.cursor = st.direction.advance(self.cursor);
                }

                CommandKind::Move => {
                    let bits = reader.read_bits(self.bit_head + widths::TAG as u64, widths::MOVE)?;
                    self.cursor = split_move(bits);
                    self.bit_head += (widths::TAG + widths::MOVE) as u64;
                    tracing::trace!(cursor = ?self.cursor, "move");
                }

                CommandKind::Flip => {
                    let bits = reader.read_bits(self.bit_head + widths::TAG as u64, widths::FLIP)?;
                    let (dx, dy) = split_flip(bits);

                    let mut view =
                        FrameView::new(framebuffers.active_mut(), header.width, header.height);
                    view.shift(dx, dy);
                    self.bit_head += (widths::TAG + widths::FLIP) as u64;
                    tracing::trace!(dx, dy, "flip");
                    break;
                }
            }
        }

        self.cursor = (0, 0);
        self.frame_index = self.frame_index.wrapping_add(1);

        tracing::debug!(
            buffer_head = self.ring.head(),
            bit_head = self.bit_head,
            frame_index = self.frame_index,
            "frame decoded"
        );
        Ok(())
    }

    /// The framebuffer that should be on screen.
    pub fn active_framebuffer(&self) -> Result<&[u8]> {
        self.framebuffers
            .as_ref()
            .map(|set| set.active())
            .ok_or(BvError::NotBound)
    }

    /// Bound framebuffers, if any.
    pub fn framebuffers(&self) -> Option<&FramebufferSet<B>> {
        self.framebuffers.as_ref()
    }

    /// Give the bound framebuffers back to the caller.
    pub fn into_framebuffers(self) -> Option<Vec<B>> {
        self.framebuffers.map(FramebufferSet::into_slots)
    }

    /// Parsed header, once configured.
    pub fn header(&self) -> Option<&StreamHeader> {
        self.header.as_ref()
    }

    /// Header summary, once configured.
    pub fn info(&self) -> Option<StreamInfo> {
        self.header.as_ref().map(StreamHeader::info)
    }

    /// Check if the header has been parsed.
    #[inline]
    pub fn is_configured(&self) -> bool {
        self.header.is_some()
    }

    /// Absolute bit offset of the next unconsumed bit.
    #[inline]
    pub fn bit_head(&self) -> u64 {
        self.bit_head
    }

    /// Absolute byte offset of the next byte to ingest.
    #[inline]
    pub fn buffer_head(&self) -> u64 {
        self.ring.head()
    }

    /// Current tile cursor in supertile units.
    #[inline]
    pub fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    /// Number of completed frames.
    #[inline]
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Ring buffer capacity in bytes.
    #[inline]
    pub fn ring_capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Progress snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            buffer_head: self.ring.head(),
            bit_head: self.bit_head,
            frame_index: self.frame_index,
            cursor: self.cursor,
        }
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Default for Session<B> {
    fn default() -> Self {
        Self::new()
    }
}
