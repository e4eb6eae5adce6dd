//! Static settings preview: the live style algorithms fed with synthetic
//! amplitudes instead of audio.

use super::bars::{bell_weight, draw_bar};
use super::color::OpacityLevels;
use super::{draw_dot, seeded_random, Layout, Surface};
use crate::config::{VisualSettings, VisualStyle};
use std::f64::consts::PI;

const BREATHING_LEVEL: f64 = 0.6;
const BARS_LEVEL: f64 = 0.7;
const RADIAL_LEVEL: f64 = 0.7;
const PREVIEW_PEAK_CHANCE: f64 = 0.15;

pub fn render_preview(surface: &mut dyn Surface, settings: &VisualSettings) {
    let layout = Layout::new(surface, settings);
    surface.fill_rect(0.0, 0.0, layout.width, layout.height, layout.bg_color);
    if !layout.is_drawable() {
        return;
    }

    match settings.style {
        VisualStyle::Scrolling => scrolling(surface, &layout),
        VisualStyle::Breathing => breathing(surface, &layout),
        VisualStyle::Bars => bars(surface, &layout),
        VisualStyle::Radial => radial(surface, &layout),
    }
}

fn scrolling(surface: &mut dyn Surface, layout: &Layout) {
    let max_dots = (layout.max_height / layout.effective_spacing).floor().max(0.0) as usize;

    for x in layout.columns(layout.spacing) {
        let fake = 0.3 + 0.7 * (x / layout.width * PI * 3.0).sin().abs();

        let center_color = if layout.levels.is_some() {
            let peak = seeded_random(x) < PREVIEW_PEAK_CHANCE;
            layout.color_for(if peak { 1.0 } else { 0.5 + fake * 0.3 })
        } else {
            layout.dot_color
        };
        draw_dot(surface, x, layout.center_y, layout.dot_size, center_color);

        // Dots light up while the synthetic level clears their threshold.
        let lit = (0..max_dots)
            .take_while(|&i| fake >= (i + 1) as f64 / max_dots as f64)
            .count();
        layout.draw_stack(surface, x, lit, |i| {
            if layout.levels.is_none() {
                return layout.dot_color;
            }
            let threshold = (i + 1) as f64 / max_dots as f64;
            let excess = if threshold < 1.0 {
                (fake - threshold) / (1.0 - threshold)
            } else {
                1.0
            };
            layout.color_for(excess.max(0.1))
        });
    }
}

fn breathing(surface: &mut dyn Surface, layout: &Layout) {
    let color = match layout.levels {
        Some(OpacityLevels::Five | OpacityLevels::Ten) => layout.color_for(BREATHING_LEVEL),
        _ => layout.dot_color,
    };
    let count = (BREATHING_LEVEL * layout.max_height / layout.effective_spacing)
        .floor()
        .max(0.0) as usize;
    for x in layout.columns(layout.spacing) {
        layout.draw_stack(surface, x, count, |_| color);
    }
}

fn bars(surface: &mut dyn Surface, layout: &Layout) {
    let spacing = layout.effective_spacing;
    let num_bars = (layout.width / spacing).floor().max(0.0) as usize;
    let boost = 1.0 + layout.amplitude / 100.0;
    for i in 0..num_bars {
        let x = i as f64 * spacing + spacing / 2.0;
        let level = BARS_LEVEL * bell_weight(i, num_bars) * boost;
        let bar_height = (level * layout.max_height).floor();
        draw_bar(surface, layout, x, bar_height, level);
    }
}

fn radial(surface: &mut dyn Surface, layout: &Layout) {
    let spacing = layout.effective_spacing;
    let max_radius = layout.width.min(layout.height) / 2.0 * (layout.amplitude / 100.0);
    let ring_count = (RADIAL_LEVEL * max_radius / spacing).floor().max(0.0) as usize;

    for ring in 0..ring_count {
        let radius = ring as f64 * spacing;
        let dots = ((2.0 * PI * radius) / spacing).floor().max(1.0) as usize;
        let fade = 1.0 - ring as f64 / ring_count as f64;
        let color = layout.color_for(RADIAL_LEVEL * fade);

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
