//! Decoder module - session state machine and framebuffer output.
//!
//! - [`Session`]: header parse, framebuffer binding, and frame decode
//! - Supertile decoding into 4x4 tile slots
//! - In-place viewport shift applied by flip commands
//! - Framebuffer slots owned by the caller

mod framebuffer;
mod session;
mod shift;
mod supertile;

pub use framebuffer::{
    expand_tile, FrameView, FramebufferSet, FRAMEBUFFER_SLOTS, PIXEL_CLEAR, PIXEL_SET,
};
pub use session::{DecoderConfig, Session, SessionStats};
pub use shift::shift;
pub use supertile::SLOTS_PER_SUPERTILE;
