//! Error types for bv-decoder.

use thiserror::Error;

/// Main error type for all bv stream operations.
#[derive(Debug, Error)]
pub enum BvError {
    /// The ring buffer does not yet hold the bytes a read needs.
    ///
    /// Not a real failure: ingest more bytes and retry the exact same call.
    #[error("more stream data needed")]
    NeedMoreData,

    /// Ingesting would clobber bytes that are still needed by the bit head.
    #[error("ingesting {len} bytes at buffer head {buffer_head} would overwrite unconsumed data from byte {retained}")]
    Overwrite {
        buffer_head: u64,
        len: usize,
        retained: u64,
    },

    /// Read of bytes that have already left the ring buffer window.
    #[error("read at byte {offset} is stale (buffer head {buffer_head})")]
    StaleRead { offset: u64, buffer_head: u64 },

    /// Bit field width outside the supported 1..=25 range.
    #[error("bit field width {0} is outside 1..=25")]
    FieldTooWide(u32),

    /// Stream does not start with the bv magic.
    #[error("invalid stream magic {0:02x?}")]
    InvalidMagic([u8; 6]),

    /// A tile write would land outside the framebuffer extent.
    #[error("tile at pixel ({x}, {y}) lies outside the framebuffer extent")]
    TileOutOfBounds { x: u32, y: u32 },

    /// Frame decode attempted before the header was parsed.
    #[error("stream header not configured")]
    NotConfigured,

    /// Header parse attempted twice on one session.
    #[error("stream header already configured")]
    AlreadyConfigured,

    /// Frame decode attempted before a framebuffer was bound.
    #[error("no framebuffer bound")]
    NotBound,

    /// Framebuffers were bound twice on one session.
    #[error("framebuffers already bound")]
    AlreadyBound,

    /// A bound framebuffer slot cannot hold a full frame.
    #[error("framebuffer slot {slot} holds {len} bytes, {required} required")]
    FramebufferTooSmall {
        slot: usize,
        len: usize,
        required: usize,
    },

    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input the encoder cannot express in the bv format.
    #[error("encode error: {0}")]
    Encode(String),

    /// I/O error while pulling bytes from a stream source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BvError {
    /// Check if this is the retryable "ingest more and call again" signal.
    #[inline]
    pub fn is_need_more_data(&self) -> bool {
        matches!(self, BvError::NeedMoreData)
    }

    /// Check if the session must be abandoned after this error.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        !self.is_need_more_data()
    }
}

/// Result type alias using BvError.
pub type Result<T> = std::result::Result<T, BvError>;
