use super::{draw_dot, seeded_random, Layout, Surface};
use crate::audio::DecodedAudio;

const BASELINE_SIZE: f64 = 0.6;
const BASELINE_ALPHA: f64 = 0.3;
const BASELINE_STEP: f64 = 1.5;
const PEAK_CHANCE: f64 = 0.25;
const BRIGHT_SPOT_CHANCE: f64 = 0.18;

/// Time-domain waveform sliding under a read head centred on `time_s`.
pub(super) fn render(
    surface: &mut dyn Surface,
    layout: &Layout,
    window_s: f64,
    time_s: f64,
    audio: Option<&DecodedAudio>,
) {
    let Some(audio) = audio else {
        return;
    };

    let baseline_color = layout.dot_color.blend_over(layout.bg_color, BASELINE_ALPHA);
    let baseline_size = layout.dot_size * BASELINE_SIZE;
    for x in layout.columns(layout.spacing * BASELINE_STEP) {
        draw_dot(surface, x, layout.center_y, baseline_size, baseline_color);
    }

    let max_dots = (layout.max_height / layout.effective_spacing).floor();
    let duration = audio.duration_s();

    for x in layout.columns(layout.spacing) {
        let sample_time = time_s + (x / layout.width) * window_s - window_s / 2.0;
        let amp = if sample_time >= 0.0 && sample_time < duration {
            audio.amplitude_at(sample_time) as f64
        } else {
            0.0
        };

        let center_color = if layout.levels.is_some() {
            let peak = seeded_random(sample_time * 50.0) < PEAK_CHANCE;
            let opacity = if peak { 1.0 } else { (0.5 + amp * 0.5).min(1.0) };
            layout.color_for(opacity)
        } else {
            layout.dot_color
        };
        draw_dot(surface, x, layout.center_y, layout.dot_size, center_color);

        let count = (amp * max_dots).floor().max(0.0) as usize;
        layout.draw_stack(surface, x, count, |i| {
            if layout.levels.is_none() {
                return layout.dot_color;
            }
            let bright = seeded_random((sample_time + i as f64 * 0.1) * 1000.0) < BRIGHT_SPOT_CHANCE;
            let opacity = if bright {
                1.0
            } else {
                let fade = 1.0 - i as f64 / count as f64;
                (fade * 0.8).max(0.3)
            };
            layout.color_for(opacity)
        });
    }
}
