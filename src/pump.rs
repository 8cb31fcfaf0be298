//! Drivers that move bytes from a source into a session.
//!
//! The session never reads by itself; a pump owns the byte source and
//! follows the retry contract: decode, and on `NeedMoreData` ingest one
//! more chunk and decode again. Chunks are capped by the session's ingest
//! budget, so the pump never overruns unconsumed ring buffer data.
//!
//! # Configuration
//!
//! - `chunk_size`: Maximum bytes pulled per read (default: 1024)
//! - `decoder`: Ring buffer configuration of the underlying session
//!
//! # Example
//!
//! ```
//! use bv_decoder::pump::StreamPump;
//! use bv_decoder::protocol::StreamHeader;
//! use bv_decoder::writer::StreamWriter;
//!
//! let mut writer = StreamWriter::new(&StreamHeader::new(16, 16, 30));
//! writer.flip(0, 0);
//! let stream = writer.finish();
//!
//! let mut pump = StreamPump::open(&stream[..]).unwrap();
//! assert_eq!(pump.next_frame().unwrap(), Some(1));
//! assert_eq!(pump.next_frame().unwrap(), None);
//! ```

use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::decoder::{DecoderConfig, Session};
use crate::error::{BvError, Result};

/// Default bytes pulled from the source per read.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Configuration for stream pumps.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Maximum bytes pulled per read.
    pub chunk_size: usize,
    /// Session configuration.
    pub decoder: DecoderConfig,
}

impl PumpConfig {
    /// Set the chunk size.
    ///
    /// Default: 1024
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the session ring buffer capacity.
    ///
    /// Default: 2048
    pub fn ring_capacity(mut self, capacity: usize) -> Self {
        self.decoder = self.decoder.ring_capacity(capacity);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(BvError::InvalidConfig("chunk size must be non-zero".to_string()));
        }
        self.decoder.validate()
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            decoder: DecoderConfig::default(),
        }
    }
}

/// Bytes to pull next, or an error when the ring is full of unconsumed
/// data and the decoder still needs more (ring too small for the stream).
fn next_read_len(session: &Session, chunk_size: usize) -> Result<usize> {
    let budget = session.ingest_budget();
    if budget == 0 {
        let err = BvError::Overwrite {
            buffer_head: session.buffer_head(),
            len: 1,
            retained: session.bit_head() / 8,
        };
        tracing::error!("Decoder starved with a full ring buffer: {}", err);
        return Err(err);
    }
    Ok(budget.min(chunk_size))
}

/// Allocate a zeroed framebuffer for a freshly configured session.
fn bind_framebuffer(session: &mut Session) -> Result<()> {
    let size = session
        .info()
        .map(|info| info.framebuffer_size)
        .ok_or(BvError::NotConfigured)?;
    session.bind(vec![vec![0u8; size]])
}

fn header_eof() -> BvError {
    BvError::Io(std::io::Error::new(
        ErrorKind::UnexpectedEof,
        "stream ended inside the header",
    ))
}

/// Blocking pump over a [`Read`] source.
pub struct StreamPump<R> {
    reader: R,
    session: Session,
    chunk: Vec<u8>,
    chunk_size: usize,
}

impl<R: Read> StreamPump<R> {
    /// Read and parse the header, then bind a zeroed framebuffer.
    pub fn open(reader: R) -> Result<Self> {
        Self::with_config(reader, PumpConfig::default())
    }

    /// Like [`StreamPump::open`] with custom configuration.
    pub fn with_config(reader: R, config: PumpConfig) -> Result<Self> {
        config.validate()?;
        let mut pump = Self {
            reader,
            session: Session::with_config(config.decoder)?,
            chunk: vec![0u8; config.chunk_size],
            chunk_size: config.chunk_size,
        };

        loop {
            match pump.session.configure() {
                Ok(()) => break,
                Err(BvError::NeedMoreData) => {
                    if !pump.fill()? {
                        return Err(header_eof());
                    }
                }
                Err(e) => return Err(e),
            }
        }

        bind_framebuffer(&mut pump.session)?;
        Ok(pump)
    }

    /// Decode the next frame, pulling bytes as needed.
    ///
    /// Returns the new frame index, or `None` once the source is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<u32>> {
        loop {
            if let Some(index) = self.session.try_decode_frame()? {
                return Ok(Some(index));
            }
            if !self.fill()? {
                tracing::debug!(frames = self.session.frame_index(), "bv stream exhausted");
                return Ok(None);
            }
        }
    }

    /// Pull one chunk; `false` at end of source.
    fn fill(&mut self) -> Result<bool> {
        let len = next_read_len(&self.session, self.chunk_size)?;
        let n = loop {
            match self.reader.read(&mut self.chunk[..len]) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if n == 0 {
            return Ok(false);
        }
        self.session.ingest(&self.chunk[..n])?;
        Ok(true)
    }

    /// The frame on display.
    pub fn framebuffer(&self) -> Result<&[u8]> {
        self.session.active_framebuffer()
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drop the source and keep the session.
    pub fn into_session(self) -> Session {
        self.session
    }
}

/// Async pump over a tokio [`AsyncRead`] source.
pub struct AsyncStreamPump<R> {
    reader: R,
    session: Session,
    chunk: BytesMut,
    chunk_size: usize,
}

impl<R: AsyncRead + Unpin> AsyncStreamPump<R> {
    /// Read and parse the header, then bind a zeroed framebuffer.
    pub async fn open(reader: R) -> Result<Self> {
        Self::with_config(reader, PumpConfig::default()).await
    }

    /// Like [`AsyncStreamPump::open`] with custom configuration.
    pub async fn with_config(reader: R, config: PumpConfig) -> Result<Self> {
        config.validate()?;
        let mut pump = Self {
            reader,
            session: Session::with_config(config.decoder)?,
            chunk: BytesMut::with_capacity(config.chunk_size),
            chunk_size: config.chunk_size,
        };

        loop {
            match pump.session.configure() {
                Ok(()) => break,
                Err(BvError::NeedMoreData) => {
                    if !pump.fill().await? {
                        return Err(header_eof());
                    }
                }
                Err(e) => return Err(e),
            }
        }

        bind_framebuffer(&mut pump.session)?;
        Ok(pump)
    }

    /// Decode the next frame, awaiting bytes as needed.
    ///
    /// Returns the new frame index, or `None` once the source is exhausted.
    pub async fn next_frame(&mut self) -> Result<Option<u32>> {
        loop {
            if let Some(index) = self.session.try_decode_frame()? {
                return Ok(Some(index));
            }
            if !self.fill().await? {
                tracing::debug!(frames = self.session.frame_index(), "bv stream exhausted");
                return Ok(None);
            }
        }
    }

    async fn fill(&mut self) -> Result<bool> {
        let len = next_read_len(&self.session, self.chunk_size)?;
        self.chunk.clear();

        let n = (&mut self.reader)
            .take(len as u64)
            .read_buf(&mut self.chunk)
            .await?;

        if n == 0 {
            return Ok(false);
        }
        self.session.ingest(&self.chunk)?;
        Ok(true)
    }

    /// The frame on display.
    pub fn framebuffer(&self) -> Result<&[u8]> {
        self.session.active_framebuffer()
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drop the source and keep the session.
    pub fn into_session(self) -> Session {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Direction, StreamHeader, HEADER_SIZE};
    use crate::writer::{StreamWriter, TileSlot};

    fn stream_with_frames(count: usize) -> bytes::Bytes {
        let mut slots = [None; 16];
        slots[0] = Some(TileSlot::Uniform(true));
        let mut writer = StreamWriter::new(&StreamHeader::new(32, 32, 30));
        for _ in 0..count {
            writer.supertile(Direction::Right, &slots).flip(0, 0);
        }
        writer.finish()
    }

    /// Reader that hands out at most 3 bytes per call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(3).min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_pump_decodes_all_frames() {
        let stream = stream_with_frames(5);
        let mut pump = StreamPump::open(&stream[..]).unwrap();

        for expected in 1..=5 {
            assert_eq!(pump.next_frame().unwrap(), Some(expected));
        }
        assert_eq!(pump.next_frame().unwrap(), None);
        assert_eq!(pump.framebuffer().unwrap()[0], 0xFF);
        assert_eq!(pump.session().buffer_head(), stream.len() as u64);
    }

    #[test]
    fn test_pump_with_short_reads() {
        let stream = stream_with_frames(3);
        let mut pump = StreamPump::open(Trickle(&stream)).unwrap();

        let mut frames = 0;
        while pump.next_frame().unwrap().is_some() {
            frames += 1;
        }
        assert_eq!(frames, 3);
    }

    #[test]
    fn test_pump_long_stream_small_ring() {
        // Far more data than the ring holds at once.
        let stream = stream_with_frames(2000);
        assert!(stream.len() > 4 * 1024);

        let config = PumpConfig::default().ring_capacity(HEADER_SIZE).chunk_size(100);
        let mut pump = StreamPump::with_config(&stream[..], config).unwrap();

        let mut last = 0;
        while let Some(index) = pump.next_frame().unwrap() {
            last = index;
        }
        assert_eq!(last, 2000);
        assert_eq!(pump.into_session().ring_capacity(), HEADER_SIZE);
    }

    #[test]
    fn test_pump_header_eof() {
        let stream = stream_with_frames(1);
        let result = StreamPump::open(&stream[..100]);
        assert!(matches!(result, Err(BvError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_pump_invalid_config() {
        let stream = stream_with_frames(1);
        let result = StreamPump::with_config(&stream[..], PumpConfig::default().chunk_size(0));
        assert!(matches!(result, Err(BvError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_async_pump_decodes_all_frames() {
        let stream = stream_with_frames(4);
        let mut pump = AsyncStreamPump::open(&stream[..]).await.unwrap();

        for expected in 1..=4 {
            assert_eq!(pump.next_frame().await.unwrap(), Some(expected));
        }
        assert_eq!(pump.next_frame().await.unwrap(), None);
        assert_eq!(pump.framebuffer().unwrap()[0], 0xFF);
    }

    #[tokio::test]
    async fn test_async_pump_over_duplex() {
        let stream = stream_with_frames(3);
        let (mut tx, rx) = tokio::io::duplex(64);

        let data = stream.clone();
        let feeder = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            for chunk in data.chunks(50) {
                tx.write_all(chunk).await.unwrap();
            }
        });

        let mut pump = AsyncStreamPump::with_config(rx, PumpConfig::default().chunk_size(64))
            .await
            .unwrap();
        let mut frames = 0;
        while pump.next_frame().await.unwrap().is_some() {
            frames += 1;
        }
        feeder.await.unwrap();

        assert_eq!(frames, 3);
        assert_eq!(pump.session().frame_index(), 3);
    }
}
