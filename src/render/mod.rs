mod halfblock;

pub use halfblock::HalfBlockRenderer;

use crate::visual::color::Rgb;
use crate::visual::{Canvas, Surface};
use std::io::Write;

/// One terminal frame: an RGBA grid exactly `term_cols` wide and
/// `2 * visual_rows` tall, plus HUD text drawn underneath.
pub struct Frame<'a> {
    pub term_cols: u16,
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    pub hud: &'a str,
    pub hud_rows: u16,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

/// Largest `(w, h)` with the source aspect ratio that fits in `max_w * max_h`.
pub fn fit_within(src_w: usize, src_h: usize, max_w: usize, max_h: usize) -> (usize, usize) {
    if src_w == 0 || src_h == 0 || max_w == 0 || max_h == 0 {
        return (0, 0);
    }
    // Compare max_w / max_h against src_w / src_h without floats.
    if max_w * src_h <= max_h * src_w {
        let h = (max_w * src_h / src_w).max(1);
        (max_w, h)
    } else {
        let w = (max_h * src_w / src_h).max(1);
        (w, max_h)
    }
}

/// Scales a canvas into a fixed pixel grid, centred, with bars of `fill`.
#[derive(Default)]
pub struct Letterbox {
    scaled: Vec<u8>,
    pixels: Vec<u8>,
}

impl Letterbox {
    pub fn compose(&mut self, canvas: &Canvas, grid_w: usize, grid_h: usize, fill: Rgb) -> &[u8] {
        let px = fill.to_rgba();
        self.pixels.clear();
        self.pixels.reserve(grid_w * grid_h * 4);
        for _ in 0..grid_w * grid_h {
            self.pixels.extend_from_slice(&px);
        }

        let (w, h) = fit_within(canvas.width(), canvas.height(), grid_w, grid_h);
        if w == 0 || h == 0 {
            return &self.pixels;
        }
        canvas.downsample_into(&mut self.scaled, w, h);

        let x0 = (grid_w - w) / 2;
        let y0 = (grid_h - h) / 2;
        for y in 0..h {
            let src = &self.scaled[y * w * 4..(y + 1) * w * 4];
            let dst = ((y0 + y) * grid_w + x0) * 4;
            self.pixels[dst..dst + w * 4].copy_from_slice(src);
        }
        &self.pixels
    }
}
