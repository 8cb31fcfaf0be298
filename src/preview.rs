//! Text rendering of framebuffers for terminals and logs.

/// Render a framebuffer as ASCII art, sampled down to `columns` x `rows`.
///
/// Set pixels print as `#`, clear pixels as a space. Every row ends with a
/// newline. Sampling takes the top-left pixel of each cell; when the frame
/// is smaller than the grid, the grid shrinks to the frame.
pub fn render_ascii(framebuffer: &[u8], width: u16, height: u16, columns: u16, rows: u16) -> String {
    let (width, height) = (width as usize, height as usize);
    let step_x = (width / columns.max(1) as usize).max(1);
    let step_y = (height / rows.max(1) as usize).max(1);

    let mut out = String::with_capacity((width / step_x + 1) * (height / step_y));
    for y in (0..height).step_by(step_y) {
        for x in (0..width).step_by(step_x) {
            let set = framebuffer.get(y * width + x).is_some_and(|&p| p != 0);
            out.push(if set { '#' } else { ' ' });
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_full_resolution() {
        let mut fb = vec![0u8; 16];
        fb[0] = 0xFF;
        fb[5] = 0xFF;
        fb[15] = 0xFF;

        let text = render_ascii(&fb, 4, 4, 4, 4);
        assert_eq!(text, "#   \n #  \n    \n   #\n");
    }

    #[test]
    fn test_render_downsampled() {
        let mut fb = vec![0u8; 64];
        for y in 0..4 {
            for x in 0..4 {
                fb[y * 8 + x] = 0xFF;
            }
        }

        assert_eq!(render_ascii(&fb, 8, 8, 2, 2), "# \n  \n");
    }

    #[test]
    fn test_render_grid_larger_than_frame() {
        let fb = vec![0xFFu8; 4];
        assert_eq!(render_ascii(&fb, 2, 2, 80, 24), "##\n##\n");
    }

    #[test]
    fn test_render_zero_grid() {
        let fb = vec![0u8; 4];
        assert_eq!(render_ascii(&fb, 2, 2, 0, 0), "  \n  \n");
    }
}
