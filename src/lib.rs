//! # bv-decoder
//!
//! Streaming decoder for the bv bitstream: a compact format for 1-bit
//! (black/white) tile-based video.
//!
//! A bv stream is a 524-byte header (magic, extents, framerate and a
//! 256-entry tile palette) followed by a little-endian bitstream of drawing
//! commands. Frames are painted as 4x4 tiles grouped into 16x16 supertiles
//! and shown on every flip command.
//!
//! ## Architecture
//!
//! - **Ring buffer** ([`protocol::RingBuffer`]): Fixed-size window over the
//!   stream, addressed by absolute offsets
//! - **Session** ([`Session`]): Resumable decoder state machine; returns
//!   [`BvError::NeedMoreData`] instead of blocking
//! - **Pumps** ([`StreamPump`], [`AsyncStreamPump`]): Feed a session from a
//!   byte source under ring buffer backpressure
//! - **Writer/Encoder** ([`StreamWriter`], [`FrameEncoder`]): Produce streams
//!   from commands or raw frames
//!
//! ## Example
//!
//! ```
//! use bv_decoder::{FrameEncoder, StreamPump};
//!
//! let mut frame = vec![0u8; 32 * 32];
//! frame[0] = 0xFF;
//!
//! let mut encoder = FrameEncoder::new(32, 32, 30, [0; 256]).unwrap();
//! encoder.encode_frame(&frame).unwrap();
//! let stream = encoder.finish();
//!
//! let mut pump = StreamPump::open(&stream[..]).unwrap();
//! while let Some(index) = pump.next_frame().unwrap() {
//!     assert_eq!(index, 1);
//! }
//! assert_eq!(pump.framebuffer().unwrap()[0], 0xFF);
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod preview;
pub mod protocol;
pub mod pump;
pub mod writer;

pub use decoder::{DecoderConfig, Session, SessionStats};
pub use encoder::FrameEncoder;
pub use error::{BvError, Result};
pub use protocol::{StreamHeader, StreamInfo};
pub use pump::{AsyncStreamPump, PumpConfig, StreamPump};
pub use writer::StreamWriter;
