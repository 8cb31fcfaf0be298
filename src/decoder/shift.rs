//! In-place viewport pan applied by the flip command.
//!
//! Vacated rows and columns keep whatever they held before the move.

/// Shift `pixels` (row-major, `width * height`) by `dx` columns and `dy`
/// rows. Positive values move content right/down.
///
/// A magnitude at or beyond the extent moves nothing along that axis.
pub fn shift(pixels: &mut [u8], width: usize, height: usize, dx: i8, dy: i8) {
    debug_assert!(pixels.len() >= width * height);

    let dx_len = dx.unsigned_abs() as usize;
    let keep_cols = width.saturating_sub(dx_len);
    if keep_cols > 0 && dx != 0 {
        for row in 0..height {
            let start = row * width;
            if dx > 0 {
                pixels.copy_within(start..start + keep_cols, start + dx_len);
            } else {
                pixels.copy_within(start + dx_len..start + width, start);
            }
        }
    }

    let dy_len = dy.unsigned_abs() as usize;
    let keep_rows = height.saturating_sub(dy_len);
    if keep_rows > 0 && dy != 0 {
        if dy > 0 {
            pixels.copy_within(0..keep_rows * width, dy_len * width);
        } else {
            pixels.copy_within(dy_len * width..height * width, 0);
        }
    }
}
