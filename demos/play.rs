//! Terminal player - decodes a `.bv` file and draws it as ASCII art.
//!
//! This example demonstrates:
//! - Opening a stream with [`StreamPump`] over a buffered file
//! - Pulling frames until the stream is exhausted
//! - Rendering the active framebuffer with `render_ascii`
//!
//! # Running
//!
//! ```text
//! cargo run --example play -- video.bv
//! cargo run --example play -- video.bv --stats
//! ```

use std::fs::File;
use std::io::{BufReader, Write};
use std::time::{Duration, Instant};

use bv_decoder::preview::render_ascii;
use bv_decoder::StreamPump;

const COLUMNS: u16 = 80;
const ROWS: u16 = 30;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: play <file.bv> [--stats]")?;
    let show_stats = args.any(|arg| arg == "--stats");

    let file = BufReader::new(File::open(&path)?);
    let mut pump = StreamPump::open(file)?;

    let info = pump.session().info().ok_or("stream not configured")?;
    let frame_time = Duration::from_secs_f64(1.0 / f64::from(info.framerate.max(1)));
    eprintln!("{}", serde_json::to_string(&info)?);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut next_deadline = Instant::now();

    while pump.next_frame()?.is_some() {
        let text = render_ascii(pump.framebuffer()?, info.width, info.height, COLUMNS, ROWS);

        // Home the cursor and redraw in place.
        write!(out, "\x1b[H{}", text)?;
        if show_stats {
            writeln!(out, "{}", serde_json::to_string(&pump.session().stats())?)?;
        }
        out.flush()?;

        next_deadline += frame_time;
        if let Some(wait) = next_deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
    }

    eprintln!("{} frames", pump.session().frame_index());
    Ok(())
}
