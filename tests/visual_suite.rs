use wavestudio::analyzer::LiveAnalysisSnapshot;
use wavestudio::audio::DecodedAudio;
use wavestudio::config::{OpacityMode, VisualSettings, VisualStyle};
use wavestudio::visual::color::{discrete_opacity_color, quantize_opacity, OpacityLevels, Rgb};
use wavestudio::visual::{render_preview, BarEnvelope, Canvas, FrameRenderer, Surface};

const DOT: Rgb = Rgb::new(0, 210, 255);

/// Surface double that keeps every draw call.
struct Recorder {
    w: usize,
    h: usize,
    rects: Vec<(f64, f64, f64, f64, Rgb)>,
    circles: Vec<(f64, f64, f64, Rgb)>,
}

impl Recorder {
    fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            rects: Vec::new(),
            circles: Vec::new(),
        }
    }
}

impl Surface for Recorder {
    fn width(&self) -> usize {
        self.w
    }

    fn height(&self) -> usize {
        self.h
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgb) {
        self.rects.push((x, y, w, h, color));
    }

    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgb) {
        self.circles.push((cx, cy, radius, color));
    }
}

fn settings(style: VisualStyle, opacity_mode: OpacityMode) -> VisualSettings {
    VisualSettings {
        style,
        opacity_mode,
        ..VisualSettings::default()
    }
}

fn snapshot(rms: f32) -> LiveAnalysisSnapshot {
    LiveAnalysisSnapshot {
        rms,
        ..LiveAnalysisSnapshot::default()
    }
}

// ── Colour mixing ───────────────────────────────────────────────────────────

#[test]
fn half_opacity_blend_rounds_to_nearest() {
    assert_eq!(DOT.blend_over(Rgb::BLACK, 0.5), Rgb::new(0, 105, 128));
}

#[test]
fn three_level_boundary_is_inclusive() {
    assert_eq!(quantize_opacity(0.15, OpacityLevels::Three), 0.0);
    assert_eq!(quantize_opacity(0.1500001, OpacityLevels::Three), 0.5);
    assert_eq!(quantize_opacity(0.65, OpacityLevels::Three), 0.5);
    assert_eq!(quantize_opacity(0.66, OpacityLevels::Three), 1.0);
}

#[test]
fn five_level_steps() {
    let steps: Vec<f64> = [0.05, 0.2, 0.5, 0.7, 0.9]
        .iter()
        .map(|&a| quantize_opacity(a, OpacityLevels::Five))
        .collect();
    assert_eq!(steps, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
}

#[test]
fn ten_levels_never_hide_a_dot() {
    assert_eq!(quantize_opacity(0.0, OpacityLevels::Ten), 0.1);
    assert_eq!(quantize_opacity(0.1, OpacityLevels::Ten), 0.1);
    assert_eq!(quantize_opacity(0.15, OpacityLevels::Ten), 0.2);
    assert_eq!(quantize_opacity(1.0, OpacityLevels::Ten), 1.0);
    assert_ne!(
        discrete_opacity_color(DOT, Rgb::BLACK, 0.0, OpacityLevels::Ten),
        Rgb::BLACK
    );
}

#[test]
fn zero_opacity_is_exactly_background() {
    let bg = Rgb::new(10, 8, 18);
    assert_eq!(discrete_opacity_color(DOT, bg, 0.01, OpacityLevels::Five), bg);
    assert_eq!(discrete_opacity_color(DOT, bg, 0.1, OpacityLevels::Three), bg);
}

// ── Bar envelope ────────────────────────────────────────────────────────────

#[test]
fn envelope_attacks_fast_and_decays_slow() {
    let mut env = BarEnvelope::default();
    env.resize(1);
    assert_eq!(env.step(0, 0.0), 0.0);
    assert!((env.step(0, 1.0) - 0.4).abs() < 1e-12);
    assert!((env.step(0, 0.0) - 0.34).abs() < 1e-12);
}

#[test]
fn bars_state_resets_when_width_changes() {
    let mut renderer = FrameRenderer::new();
    let s = settings(VisualStyle::Bars, OpacityMode::Uniform);
    let live = snapshot(0.8);

    let mut wide = Recorder::new(960, 540);
    renderer.render_frame(&mut wide, &s, 0.0, Some(&live), None);
    // Effective spacing is max(6, 6 + 1) = 7.
    assert_eq!(renderer.bar_envelope().len(), 137);
    assert!(renderer.bar_envelope().heights()[68] > 0.0);

    let mut narrow = Recorder::new(70, 540);
    renderer.render_frame(&mut narrow, &s, 0.0, Some(&snapshot(0.0)), None);
    assert_eq!(renderer.bar_envelope().len(), 10);
    assert!(renderer.bar_envelope().heights().iter().all(|&h| h == 0.0));
}

#[test]
fn bars_are_centred_rectangles() {
    let mut renderer = FrameRenderer::new();
    let s = settings(VisualStyle::Bars, OpacityMode::Uniform);
    let mut surface = Recorder::new(70, 100);
    renderer.render_frame(&mut surface, &s, 0.0, Some(&snapshot(1.0)), None);

    // First rect is the background; every bar straddles the centre line.
    assert_eq!(surface.rects[0], (0.0, 0.0, 70.0, 100.0, Rgb::BLACK));
    let bars = &surface.rects[1..];
    assert!(!bars.is_empty());
    for &(x, y, w, h, color) in bars {
        assert_eq!(w, 6.0);
        assert!((y + h / 2.0 - 50.0).abs() < 1e-9);
        assert_eq!((x + 3.0 - 3.5) % 7.0, 0.0);
        assert_eq!(color, DOT);
    }
}

// ── Scrolling ───────────────────────────────────────────────────────────────

#[test]
fn silent_track_draws_only_baseline_and_centre_dots() {
    let audio = DecodedAudio::new(vec![0.0; 88_200], 44_100).unwrap();
    let s = settings(VisualStyle::Scrolling, OpacityMode::Uniform);
    let mut surface = Recorder::new(960, 540);
    FrameRenderer::new().render_frame(&mut surface, &s, 1.0, None, Some(&audio));

    assert_eq!(surface.rects, vec![(0.0, 0.0, 960.0, 540.0, Rgb::BLACK)]);
    assert!(surface.circles.iter().all(|&(_, cy, _, _)| cy == 270.0));

    let baseline = DOT.blend_over(Rgb::BLACK, 0.3);
    let faint = surface.circles.iter().filter(|c| c.3 == baseline).count();
    let centre = surface
        .circles
        .iter()
        .filter(|c| c.3 == DOT && c.2 == 3.0)
        .count();
    // Baseline every 9px from x=3; signal every 6px from x=3.
    assert_eq!(faint, 107);
    assert_eq!(centre, 160);
    assert_eq!(surface.circles.len(), faint + centre);
}

#[test]
fn scrolling_without_audio_only_clears() {
    let s = settings(VisualStyle::Scrolling, OpacityMode::Uniform);
    let mut surface = Recorder::new(100, 100);
    FrameRenderer::new().render_frame(&mut surface, &s, 0.0, None, None);
    assert_eq!(surface.rects.len(), 1);
    assert!(surface.circles.is_empty());
}

#[test]
fn loud_track_stacks_dots_symmetrically() {
    let audio = DecodedAudio::new(vec![1.0; 44_100], 44_100).unwrap();
    let s = settings(VisualStyle::Scrolling, OpacityMode::Uniform);
    let mut surface = Recorder::new(120, 100);
    FrameRenderer::new().render_frame(&mut surface, &s, 0.5, None, Some(&audio));

    // maxHeight = 100 * 60 / 200 = 30 -> floor(30 / 7) = 4 dots each way.
    let column: Vec<f64> = surface
        .circles
        .iter()
        .filter(|c| c.0 == 63.0 && c.2 == 3.0)
        .map(|c| c.1)
        .collect();
    assert_eq!(column.len(), 9);
    for k in 1..=4 {
        let off = k as f64 * 7.0;
        assert!(column.contains(&(50.0 - off)));
        assert!(column.contains(&(50.0 + off)));
    }
}

#[test]
fn scrolling_is_deterministic_in_level_modes() {
    let samples: Vec<f32> = (0..44_100).map(|i| (i as f32 * 0.01).sin()).collect();
    let audio = DecodedAudio::new(samples, 44_100).unwrap();
    let s = settings(VisualStyle::Scrolling, OpacityMode::TenLevels);

    let mut a = Canvas::new(200, 120);
    let mut b = Canvas::new(200, 120);
    FrameRenderer::new().render_frame(&mut a, &s, 0.4, None, Some(&audio));
    FrameRenderer::new().render_frame(&mut b, &s, 0.4, None, Some(&audio));
    assert_eq!(a.as_rgba(), b.as_rgba());
}

// ── Breathing ───────────────────────────────────────────────────────────────

#[test]
fn breathing_skips_frame_when_colour_is_background() {
    let mut s = settings(VisualStyle::Breathing, OpacityMode::FiveLevels);
    s.amplitude = 100.0;
    let mut surface = Recorder::new(100, 100);
    FrameRenderer::new().render_frame(&mut surface, &s, 0.0, Some(&snapshot(0.04)), None);
    assert_eq!(surface.rects.len(), 1);
    assert!(surface.circles.is_empty());
}

#[test]
fn breathing_ten_levels_always_draws() {
    let mut s = settings(VisualStyle::Breathing, OpacityMode::TenLevels);
    s.amplitude = 100.0;
    let mut surface = Recorder::new(100, 100);
    FrameRenderer::new().render_frame(&mut surface, &s, 0.0, Some(&snapshot(0.25)), None);

    // count = floor(0.25 * 50 / 7) = 1, so two dots per column.
    assert!(!surface.circles.is_empty());
    let tint = DOT.blend_over(Rgb::BLACK, 0.3);
    assert!(surface.circles.iter().all(|c| c.3 == tint));
    assert!(surface.circles.iter().all(|c| c.1 == 43.0 || c.1 == 57.0));
}

#[test]
fn breathing_three_levels_uses_plain_colour() {
    let mut s = settings(VisualStyle::Breathing, OpacityMode::ThreeLevels);
    s.amplitude = 100.0;
    let mut surface = Recorder::new(100, 100);
    FrameRenderer::new().render_frame(&mut surface, &s, 0.0, Some(&snapshot(0.3)), None);
    assert!(!surface.circles.is_empty());
    assert!(surface.circles.iter().all(|c| c.3 == DOT));
}

// ── Radial ──────────────────────────────────────────────────────────────────

#[test]
fn radial_rings_fade_outwards() {
    let mut s = settings(VisualStyle::Radial, OpacityMode::TenLevels);
    s.amplitude = 100.0;
    let mut surface = Recorder::new(200, 200);
    FrameRenderer::new().render_frame(&mut surface, &s, 0.0, Some(&snapshot(1.0)), None);

    // maxRadius 100 -> floor(100 / 7) = 14 rings; ring 0 is a single centre dot.
    let centre: Vec<_> = surface
        .circles
        .iter()
        .filter(|c| c.0 == 100.0 && c.1 == 100.0)
        .collect();
    assert_eq!(centre.len(), 1);
    assert_eq!(centre[0].3, DOT);

    let outer = surface.circles.last().unwrap();
    let dx = outer.0 - 100.0;
    let dy = outer.1 - 100.0;
    assert!(((dx * dx + dy * dy).sqrt() - 13.0 * 7.0).abs() < 1e-6);
    assert_ne!(outer.3, DOT);
}

#[test]
fn radial_silence_draws_nothing() {
    let s = settings(VisualStyle::Radial, OpacityMode::Uniform);
    let mut surface = Recorder::new(200, 200);
    FrameRenderer::new().render_frame(&mut surface, &s, 0.0, Some(&snapshot(0.0)), None);
    assert!(surface.circles.is_empty());
}

#[test]
fn radial_skips_dots_outside_the_surface() {
    let mut s = settings(VisualStyle::Radial, OpacityMode::Uniform);
    s.amplitude = 300.0;
    let (w, h) = (400.0, 60.0);
    let mut surface = Recorder::new(400, 60);
    FrameRenderer::new().render_frame(&mut surface, &s, 0.0, Some(&snapshot(1.0)), None);

    // maxRadius 90 -> 12 rings at spacing 7; rings past radius 30 leave the
    // 60 px tall surface except near the horizontal axis.
    let full: usize = (0..12)
        .map(|k| ((2.0 * std::f64::consts::PI * k as f64).floor() as usize).max(1))
        .sum();
    assert!(!surface.circles.is_empty());
    assert!(surface.circles.len() < full);
    for &(x, y, _, _) in &surface.circles {
        assert!((0.0..w).contains(&x) && (0.0..h).contains(&y), "dot at ({x}, {y})");
    }
    // The outermost ring still shows where it crosses the canvas.
    assert!(surface.circles.iter().any(|c| c.0 > 200.0 + 70.0));
}

#[test]
fn radial_drops_rings_that_fade_to_background() {
    // 400x400 at amplitude 100: 28 rings. 5 levels hide ring 27 (fade <= 0.05);
    // 3 levels hide rings 24..=27 (fade <= 0.15).
    for (mode, outermost) in [(OpacityMode::FiveLevels, 26.0), (OpacityMode::ThreeLevels, 23.0)] {
        let mut s = settings(VisualStyle::Radial, mode);
        s.amplitude = 100.0;
        let mut surface = Recorder::new(400, 400);
        FrameRenderer::new().render_frame(&mut surface, &s, 0.0, Some(&snapshot(1.0)), None);

        assert!(surface.circles.iter().all(|c| c.3 != Rgb::BLACK), "{mode:?}");
        let reach = surface
            .circles
            .iter()
            .map(|c| ((c.0 - 200.0).powi(2) + (c.1 - 200.0).powi(2)).sqrt())
            .fold(0.0f64, f64::max);
        assert!((reach - outermost * 7.0).abs() < 1e-6, "{mode:?}: reach {reach}");
    }
}

// ── Degenerate settings ─────────────────────────────────────────────────────

#[test]
fn zero_spacing_only_clears() {
    let mut s = settings(VisualStyle::Breathing, OpacityMode::Uniform);
    s.dot_spacing = 0.0;
    let mut surface = Recorder::new(50, 50);
    FrameRenderer::new().render_frame(&mut surface, &s, 0.0, Some(&snapshot(1.0)), None);
    assert_eq!(surface.rects.len(), 1);
    assert!(surface.circles.is_empty());
}

// ── Preview ─────────────────────────────────────────────────────────────────

#[test]
fn preview_paints_every_style_without_audio() {
    for style in VisualStyle::all() {
        let s = settings(style, OpacityMode::FiveLevels);
        let mut canvas = Canvas::new(320, 180);
        render_preview(&mut canvas, &s);
        let drawn = canvas
            .as_rgba()
            .chunks_exact(4)
            .filter(|px| px[..3] != [0, 0, 0])
            .count();
        assert!(drawn > 0, "{style:?} preview drew nothing");
    }
}

#[test]
fn preview_breathing_uses_fixed_level() {
    let s = settings(VisualStyle::Breathing, OpacityMode::Uniform);
    let mut canvas = Canvas::new(960, 540);
    render_preview(&mut canvas, &s);
    // floor(0.6 * 162 / 7) = 13 dots above the centre in the first column.
    assert_eq!(canvas.pixel(3, 270 - 7), Some(DOT));
    assert_eq!(canvas.pixel(3, 270 - 13 * 7), Some(DOT));
    assert_eq!(canvas.pixel(3, 270 - 14 * 7), Some(Rgb::BLACK));
}
