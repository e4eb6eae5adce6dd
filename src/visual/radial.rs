use super::color::OpacityLevels;
use super::{draw_dot, Layout, Surface};
use std::f64::consts::PI;

/// Concentric rings of dots around the canvas centre, fading outwards.
pub(super) fn render(surface: &mut dyn Surface, layout: &Layout, rms: f64) {
    let spacing = layout.effective_spacing;
    let max_radius = layout.width.min(layout.height) / 2.0 * (layout.amplitude / 100.0);
    let ring_count = (rms * max_radius / spacing).floor().max(0.0) as usize;

    for ring in 0..ring_count {
        let radius = ring as f64 * spacing;
        let dots = ((2.0 * PI * radius) / spacing).floor().max(1.0) as usize;

        let color = match layout.levels {
            Some(levels) => {
                let fade = 1.0 - ring as f64 / ring_count as f64;
                let c = layout.color_for(rms * fade);
                if levels != OpacityLevels::Ten && c == layout.bg_color {
                    continue;
                }
                c
            }
            None => layout.dot_color,
        };

        for i in 0..dots {
            let angle = 2.0 * PI * i as f64 / dots as f64;
            let x = layout.center_x + radius * angle.cos();
            let y = layout.center_y + radius * angle.sin();
            if x >= 0.0 && x < layout.width && y >= 0.0 && y < layout.height {
                draw_dot(surface, x, y, layout.dot_size, color);
            }
        }
    }
}
