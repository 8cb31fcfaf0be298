//! Integration tests for bv-decoder.
//!
//! These tests drive whole streams through the public API.

use bv_decoder::protocol::{Direction, StreamHeader, HEADER_BITS, HEADER_SIZE};
use bv_decoder::writer::TileSlot;
use bv_decoder::{
    AsyncStreamPump, BvError, DecoderConfig, FrameEncoder, PumpConfig, Session, StreamPump,
    StreamWriter,
};

fn single_slot(slot: TileSlot) -> [Option<TileSlot>; 16] {
    let mut slots = [None; 16];
    slots[0] = Some(slot);
    slots
}

fn block_is(fb: &[u8], width: usize, x0: usize, y0: usize, value: u8) -> bool {
    (0..4).all(|y| (0..4).all(|x| fb[(y0 + y) * width + x0 + x] == value))
}

/// Pseudo-random frame with some large uniform areas, pixels 0 or 0xFF.
fn noise_frame(width: usize, height: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..width * height)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let (x, y) = (i % width, i / width);
            if (x / 16 + y / 16 + seed as usize) % 3 == 0 {
                0xFF
            } else if (x / 8 + y / 8) % 2 == 0 {
                0
            } else if state & 1 == 1 {
                0xFF
            } else {
                0
            }
        })
        .collect()
}

/// Header, one uniform supertile and a flip, fed in one piece.
#[test]
fn test_end_to_end_single_frame() {
    let header = StreamHeader::new(32, 32, 30);
    let mut writer = StreamWriter::new(&header);
    writer
        .supertile(Direction::Right, &single_slot(TileSlot::Uniform(true)))
        .flip(0, 0);
    let stream = writer.finish();

    let mut session = Session::new();
    session.ingest(&stream).unwrap();
    session.configure().unwrap();
    session.bind(vec![vec![0u8; 32 * 32]]).unwrap();

    session.decode_frame().unwrap();
    assert_eq!(session.frame_index(), 1);
    assert_eq!(session.cursor(), (0, 0));

    let fb = session.active_framebuffer().unwrap();
    assert!(block_is(fb, 32, 0, 0, 0xFF));
    assert_eq!(fb.iter().filter(|&&p| p == 0xFF).count(), 16);

    let before = session.stats();
    assert!(matches!(session.decode_frame(), Err(BvError::NeedMoreData)));
    assert_eq!(session.stats(), before);
}

/// Caller-owned framebuffer storage works through the generic slot type.
#[test]
fn test_borrowed_framebuffer() {
    let header = StreamHeader::new(16, 16, 30);
    let mut writer = StreamWriter::new(&header);
    writer
        .supertile(Direction::Down, &single_slot(TileSlot::Inline(0x8001)))
        .flip(0, 0);
    let stream = writer.finish();

    let mut storage = [0u8; 16 * 16];
    {
        let mut session: Session<&mut [u8]> = Session::new();
        session.ingest(&stream).unwrap();
        session.configure().unwrap();
        session.bind([&mut storage[..]]).unwrap();
        session.decode_frame().unwrap();

        let slots = session.into_framebuffers().unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0][0], 0xFF);
    }

    assert_eq!(storage[0], 0xFF);
    assert_eq!(storage[1], 0);
    assert_eq!(storage[3 * 16 + 3], 0xFF);
}

#[test]
fn test_bit_head_monotonic_across_frames() {
    let header = StreamHeader::new(32, 32, 30);
    let mut writer = StreamWriter::new(&header);
    for i in 0..10u8 {
        writer
            .supertile(Direction::Right, &single_slot(TileSlot::Indexed(i)))
            .move_to(1, 1)
            .unwrap()
            .supertile(Direction::Up, &single_slot(TileSlot::Uniform(i % 2 == 0)))
            .flip(0, 0);
    }
    let stream = writer.finish();

    let mut session = Session::new();
    session.ingest(&stream).unwrap();
    session.configure().unwrap();
    session.bind(vec![vec![0u8; 32 * 32]]).unwrap();

    let mut last = session.bit_head();
    assert_eq!(last, HEADER_BITS);
    for frame in 1..=10 {
        session.decode_frame().unwrap();
        assert!(session.bit_head() > last);
        assert_eq!(session.frame_index(), frame);
        assert_eq!(session.cursor(), (0, 0));
        last = session.bit_head();
    }
    assert!(matches!(session.decode_frame(), Err(BvError::NeedMoreData)));
}

/// Ingest that would overrun unconsumed bytes is refused and changes nothing.
#[test]
fn test_overwrite_guard() {
    let header = StreamHeader::new(32, 32, 30);
    let mut writer = StreamWriter::new(&header);
    writer.flip(0, 0);
    let stream = writer.finish();

    let mut session = Session::with_config(DecoderConfig::default().ring_capacity(600)).unwrap();
    session.ingest(&stream).unwrap();
    session.configure().unwrap();

    // The header is consumed; the flip bytes are not.
    let budget = session.ingest_budget();
    assert_eq!(budget, 600 - (stream.len() - HEADER_SIZE));

    let head = session.buffer_head();
    let err = session.ingest(&vec![0u8; budget + 1]).unwrap_err();
    assert!(matches!(err, BvError::Overwrite { .. }));
    assert_eq!(session.buffer_head(), head);

    session.bind(vec![vec![0u8; 32 * 32]]).unwrap();
    session.decode_frame().unwrap();
    assert_eq!(session.frame_index(), 1);
}

/// Frames encoded from pixels decode back to the same pixels, through a
/// ring far smaller than the stream.
#[test]
fn test_encoder_round_trip_through_small_ring() {
    let (width, height) = (64usize, 48usize);
    let frames: Vec<Vec<u8>> = (0..40).map(|i| noise_frame(width, height, i)).collect();

    let tileset = bv_decoder::encoder::build_palette(&frames, width as u16, height as u16);
    let mut encoder = FrameEncoder::new(width as u16, height as u16, 24, tileset).unwrap();
    for frame in &frames {
        encoder.encode_frame(frame).unwrap();
    }
    let stream = encoder.finish();
    assert!(stream.len() > 4 * 600);

    let config = PumpConfig::default().ring_capacity(600).chunk_size(37);
    let mut pump = StreamPump::with_config(&stream[..], config).unwrap();

    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(pump.next_frame().unwrap(), Some(i as u32 + 1));
        assert_eq!(pump.framebuffer().unwrap(), &frame[..], "frame {}", i + 1);
    }
    assert_eq!(pump.next_frame().unwrap(), None);
}

/// Grayscale frames are dithered to bi-level and decode to exactly that.
#[test]
fn test_grayscale_frames_round_trip() {
    let (width, height) = (48u16, 32u16);
    let gray: Vec<Vec<u8>> = (0..6u32)
        .map(|t| {
            (0..width as u32 * height as u32)
                .map(|i| {
                    let (x, y) = (i % width as u32, i / width as u32);
                    ((x * 5 + y * 3 + t * 20) % 256) as u8
                })
                .collect()
        })
        .collect();
    let frames: Vec<Vec<u8>> = gray
        .iter()
        .map(|g| bv_decoder::encoder::quantize(g, width, height))
        .collect();

    let tileset = bv_decoder::encoder::build_palette(&frames, width, height);
    let mut encoder = FrameEncoder::new(width, height, 30, tileset).unwrap();
    for frame in &frames {
        encoder.encode_frame(frame).unwrap();
    }
    let stream = encoder.finish();

    let mut pump = StreamPump::open(&stream[..]).unwrap();
    for frame in &frames {
        assert!(pump.next_frame().unwrap().is_some());
        assert_eq!(pump.framebuffer().unwrap(), &frame[..]);
    }
    assert_eq!(pump.next_frame().unwrap(), None);
}

/// A stream many times the ring capacity keeps decoding across wraps.
#[test]
fn test_long_stream_wraps_ring() {
    let header = StreamHeader::new(32, 32, 30);
    let mut writer = StreamWriter::new(&header);
    for i in 0..3000u32 {
        let slot = TileSlot::Inline(i as u16 | 1);
        writer.supertile(Direction::Right, &single_slot(slot)).flip(0, 0);
    }
    let stream = writer.finish();
    assert!(stream.len() > 10 * 2048);

    let mut pump = StreamPump::open(&stream[..]).unwrap();
    let mut count = 0;
    while pump.next_frame().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 3000);

    let session = pump.into_session();
    assert_eq!(session.buffer_head(), stream.len() as u64);
    // Last pattern: 2999 | 1 = 0x0BB7, pixel 0 set, pixel 3 clear.
    let fb = session.active_framebuffer().unwrap();
    assert_eq!(fb[0], 0xFF);
    assert_eq!(fb[3], 0);
}

/// A flip pan moves the whole picture.
#[test]
fn test_flip_pans_picture() {
    let header = StreamHeader::new(32, 32, 30);
    let mut writer = StreamWriter::new(&header);
    writer
        .supertile(Direction::Right, &single_slot(TileSlot::Uniform(true)))
        .flip(4, 8);
    let stream = writer.finish();

    let mut pump = StreamPump::open(&stream[..]).unwrap();
    assert_eq!(pump.next_frame().unwrap(), Some(1));

    let fb = pump.framebuffer().unwrap();
    assert!(block_is(fb, 32, 4, 8, 0xFF));
}

#[tokio::test]
async fn test_async_pump_matches_sync() {
    let (width, height) = (32usize, 32usize);
    let frames: Vec<Vec<u8>> = (0..8).map(|i| noise_frame(width, height, i * 7)).collect();

    let mut encoder = FrameEncoder::new(32, 32, 30, [0; 256]).unwrap();
    for frame in &frames {
        encoder.encode_frame(frame).unwrap();
    }
    let stream = encoder.finish();

    let mut pump = AsyncStreamPump::with_config(&stream[..], PumpConfig::default().chunk_size(16))
        .await
        .unwrap();
    for frame in &frames {
        assert!(pump.next_frame().await.unwrap().is_some());
        assert_eq!(pump.framebuffer().unwrap(), &frame[..]);
    }
    assert_eq!(pump.next_frame().await.unwrap(), None);
}
