use super::Surface;
use super::color::Rgb;

/// Owned RGBA8 raster.
///
/// A pixel is painted by a shape when its centre `(x + 0.5, y + 0.5)` falls
/// inside the shape. There is no anti-aliasing.
#[derive(Clone, Debug)]
pub struct Canvas {
    w: usize,
    h: usize,
    rgba: Vec<u8>,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            rgba: vec![0; w * h * 4],
        }
    }

    /// Resize, clearing to transparent black when the size changes.
    pub fn resize(&mut self, w: usize, h: usize) {
        if self.w == w && self.h == h {
            return;
        }
        self.w = w;
        self.h = h;
        self.rgba.clear();
        self.rgba.resize(w * h * 4, 0);
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.w || y >= self.h {
            return None;
        }
        let i = (y * self.w + x) * 4;
        Some(Rgb::new(self.rgba[i], self.rgba[i + 1], self.rgba[i + 2]))
    }

    fn put(&mut self, x: usize, y: usize, px: [u8; 4]) {
        let i = (y * self.w + x) * 4;
        self.rgba[i..i + 4].copy_from_slice(&px);
    }

    /// Box-filter this canvas into a `dw * dh` RGBA buffer.
    pub fn downsample_into(&self, dst: &mut Vec<u8>, dw: usize, dh: usize) {
        dst.clear();
        dst.resize(dw * dh * 4, 0);
        if self.w == 0 || self.h == 0 || dw == 0 || dh == 0 {
            return;
        }

        for dy in 0..dh {
            let y0 = dy * self.h / dh;
            let y1 = ((dy + 1) * self.h / dh).max(y0 + 1).min(self.h);
            for dx in 0..dw {
                let x0 = dx * self.w / dw;
                let x1 = ((dx + 1) * self.w / dw).max(x0 + 1).min(self.w);

                let mut acc = [0u32; 4];
                for sy in y0..y1 {
                    let row = sy * self.w;
                    for sx in x0..x1 {
                        let i = (row + sx) * 4;
                        for c in 0..4 {
                            acc[c] += self.rgba[i + c] as u32;
                        }
                    }
                }
                let n = ((y1 - y0) * (x1 - x0)).max(1) as u32;
                let o = (dy * dw + dx) * 4;
                for c in 0..4 {
                    dst[o + c] = (acc[c] / n) as u8;
                }
            }
        }
    }
}

/// Indices of pixels whose centres fall in `[lo, hi)`, clipped to `0..limit`.
fn covered_span(lo: f64, hi: f64, limit: usize) -> std::ops::Range<usize> {
    let start = (lo - 0.5).ceil().max(0.0);
    let end = (hi - 0.5).ceil().min(limit as f64);
    if !(start < end) {
        return 0..0;
    }
    start as usize..end as usize
}

impl Surface for Canvas {
    fn width(&self) -> usize {
        self.w
    }

    fn height(&self) -> usize {
        self.h
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgb) {
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        let px = color.to_rgba();
        let xs = covered_span(x, x + w, self.w);
        for yy in covered_span(y, y + h, self.h) {
            for xx in xs.clone() {
                self.put(xx, yy, px);
            }
        }
    }

    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgb) {
        if !(radius > 0.0) || !cx.is_finite() || !cy.is_finite() {
            return;
        }
        let px = color.to_rgba();
        let r2 = radius * radius;
        let mut painted = false;
        for yy in covered_span(cy - radius, cy + radius + 1.0, self.h) {
            let dy = yy as f64 + 0.5 - cy;
            for xx in covered_span(cx - radius, cx + radius + 1.0, self.w) {
                let dx = xx as f64 + 0.5 - cx;
                if dx * dx + dy * dy <= r2 {
                    self.put(xx, yy, px);
                    painted = true;
                }
            }
        }

        if !painted && cx >= 0.0 && cy >= 0.0 {
            let (xx, yy) = (cx.floor() as usize, cy.floor() as usize);
            if xx < self.w && yy < self.h {
                self.put(xx, yy, px);
            }
        }
    }
}
