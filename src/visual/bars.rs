use super::{Layout, Surface};

/// Rise factor: `state = state * BAR_ATTACK + target * (1 - BAR_ATTACK)`.
pub const BAR_ATTACK: f64 = 0.6;
/// Fall factor: `state *= BAR_DECAY`.
pub const BAR_DECAY: f64 = 0.85;

/// Smoothed height per bar, with fast attack and slow decay.
#[derive(Clone, Debug, Default)]
pub struct BarEnvelope {
    heights: Vec<f64>,
}

impl BarEnvelope {
    /// Reset to `count` zeroed bars if the bar count changed; otherwise keep state.
    pub fn resize(&mut self, count: usize) {
        if self.heights.len() != count {
            self.heights = vec![0.0; count];
        }
    }

    /// Move bar `i` toward `target` and return its new height.
    pub fn step(&mut self, i: usize, target: f64) -> f64 {
        let Some(h) = self.heights.get_mut(i) else {
            return 0.0;
        };
        if target > *h {
            *h = *h * BAR_ATTACK + target * (1.0 - BAR_ATTACK);
        } else {
            *h *= BAR_DECAY;
        }
        *h
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}

/// `exp(-4 d^2)` where `d` is bar `i`'s normalized distance from the middle bar.
pub(super) fn bell_weight(i: usize, num_bars: usize) -> f64 {
    let half = num_bars / 2;
    let d = if half > 0 {
        (i as f64 - half as f64).abs() / half as f64
    } else {
        0.0
    };
    (-4.0 * d * d).exp()
}

pub(super) fn draw_bar(surface: &mut dyn Surface, layout: &Layout, x: f64, bar_height: f64, state: f64) {
    if bar_height <= 0.0 {
        return;
    }
    let color = layout.color_for(state);
    let y_start = layout.center_y - bar_height / 2.0;
    surface.fill_rect(x - layout.dot_size / 2.0, y_start, layout.dot_size, bar_height, color);
}

/// Bell-shaped bar graph driven by RMS through the envelope.
pub(super) fn render(surface: &mut dyn Surface, layout: &Layout, envelope: &mut BarEnvelope, rms: f64) {
    let spacing = layout.effective_spacing;
    let num_bars = (layout.width / spacing).floor().max(0.0) as usize;
    envelope.resize(num_bars);

    let boost = 1.0 + layout.amplitude / 100.0;
    for i in 0..num_bars {
        let x = i as f64 * spacing + spacing / 2.0;
        let target = rms * bell_weight(i, num_bars) * boost;
        let state = envelope.step(i, target);
        let bar_height = (state * layout.max_height).floor();
        draw_bar(surface, layout, x, bar_height, state);
    }
}
