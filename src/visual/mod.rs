mod bars;
mod breathing;
mod canvas;
pub mod color;
mod preview;
mod radial;
mod scrolling;

use crate::analyzer::LiveAnalysisSnapshot;
use crate::audio::DecodedAudio;
use crate::config::{VisualSettings, VisualStyle};
use color::{discrete_opacity_color, OpacityLevels, Rgb};

pub use bars::{BarEnvelope, BAR_ATTACK, BAR_DECAY};
pub use canvas::Canvas;
pub use preview::render_preview;

/// 2D raster target addressed in pixels, `(0, 0)` at the top-left.
pub trait Surface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgb);
    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgb);
}

/// Dot spacing actually used for placement: never closer than `size + 1`.
pub fn effective_spacing(spacing: f64, dot_size: f64) -> f64 {
    spacing.max(dot_size + 1.0)
}

/// Deterministic noise in `[0, 1)`: fractional part of `sin(seed) * 10000`.
pub fn seeded_random(seed: f64) -> f64 {
    let x = seed.sin() * 10000.0;
    x - x.floor()
}

pub(crate) fn draw_dot(surface: &mut dyn Surface, x: f64, y: f64, size: f64, color: Rgb) {
    surface.fill_circle(x, y, size / 2.0, color);
}

/// Per-frame geometry and colours shared by every style routine.
pub(crate) struct Layout {
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
    /// Amplitude setting, percent of half-height (or radius).
    pub amplitude: f64,
    /// Half-height reach in pixels.
    pub max_height: f64,
    pub spacing: f64,
    pub effective_spacing: f64,
    pub dot_size: f64,
    pub dot_color: Rgb,
    pub bg_color: Rgb,
    pub levels: Option<OpacityLevels>,
}

impl Layout {
    fn new(surface: &dyn Surface, settings: &VisualSettings) -> Self {
        let width = surface.width() as f64;
        let height = surface.height() as f64;
        Self {
            width,
            height,
            center_x: width / 2.0,
            center_y: height / 2.0,
            amplitude: settings.amplitude,
            max_height: height * settings.amplitude / 200.0,
            spacing: settings.dot_spacing,
            effective_spacing: effective_spacing(settings.dot_spacing, settings.dot_size),
            dot_size: settings.dot_size,
            dot_color: settings.dot_color,
            bg_color: settings.bg_color,
            levels: settings.opacity_mode.levels(),
        }
    }

    /// Whether dot placement loops would make progress.
    fn is_drawable(&self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.spacing.is_finite()
            && self.spacing > 0.0
            && self.dot_size.is_finite()
            && self.max_height.is_finite()
    }

    /// Colour for `amplitude` under the active opacity mode; the plain dot
    /// colour in uniform mode.
    pub fn color_for(&self, amplitude: f64) -> Rgb {
        match self.levels {
            Some(levels) => discrete_opacity_color(self.dot_color, self.bg_color, amplitude, levels),
            None => self.dot_color,
        }
    }

    /// Column centres: half a spacing in, then every `spacing` pixels.
    pub fn columns(&self, step: f64) -> impl Iterator<Item = f64> + use<> {
        let width = self.width;
        std::iter::successors(Some(self.spacing / 2.0), move |x| Some(x + step))
            .take_while(move |&x| x < width)
    }

    /// Draw `count` dots above and below the centre line at column `x`,
    /// skipping those that would start off-canvas.
    pub fn draw_stack(
        &self,
        surface: &mut dyn Surface,
        x: f64,
        count: usize,
        mut color_at: impl FnMut(usize) -> Rgb,
    ) {
        for i in 0..count {
            let offset = (i + 1) as f64 * self.effective_spacing;
            let y_up = self.center_y - offset;
            let y_down = self.center_y + offset;
            let color = color_at(i);
            if y_up >= 0.0 {
                draw_dot(surface, x, y_up, self.dot_size, color);
            }
            if y_down < self.height {
                draw_dot(surface, x, y_down, self.dot_size, color);
            }
        }
    }
}

/// Turns time plus loudness features into pixels.
///
/// The bar envelope is the only state carried from one frame to the next.
#[derive(Default)]
pub struct FrameRenderer {
    bars: BarEnvelope,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bar_envelope(&self) -> &BarEnvelope {
        &self.bars
    }

    /// Drop any bar memory, e.g. after a restart.
    pub fn reset(&mut self) {
        self.bars = BarEnvelope::default();
    }

    /// Paint one frame. The surface is always cleared to the background first.
    pub fn render_frame(
        &mut self,
        surface: &mut dyn Surface,
        settings: &VisualSettings,
        time_s: f64,
        live: Option<&LiveAnalysisSnapshot>,
        audio: Option<&DecodedAudio>,
    ) {
        let layout = Layout::new(surface, settings);
        surface.fill_rect(0.0, 0.0, layout.width, layout.height, layout.bg_color);
        if !layout.is_drawable() {
            return;
        }

        let rms = live.map(|s| s.rms as f64).unwrap_or(0.0);
        match settings.style {
            VisualStyle::Scrolling => {
                scrolling::render(surface, &layout, settings.window_size, time_s, audio)
            }
            VisualStyle::Breathing => breathing::render(surface, &layout, rms),
            VisualStyle::Radial => radial::render(surface, &layout, rms),
            VisualStyle::Bars => bars::render(surface, &layout, &mut self.bars, rms),
        }
    }
}
