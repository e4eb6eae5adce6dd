use crate::analyzer::{LiveAnalysisSnapshot, LiveAnalyzer};
use crate::audio::{decode_file, DecodedAudio};
use crate::config::{Config, VisualSettings};
use crate::playback::Playback;
use crate::render::{Frame, HalfBlockRenderer, Letterbox, Renderer};
use crate::spectrum::AnalyserSpectrum;
use crate::terminal::TerminalSession;
use crate::visual::{render_preview, Canvas, FrameRenderer};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::{stdout, BufWriter, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeyAction {
    Quit,
    TogglePause,
    Restart,
    NextStyle,
    NextOpacity,
}

fn key_action(code: KeyCode, mods: KeyModifiers) -> Option<KeyAction> {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return Some(KeyAction::Quit);
    }
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(KeyAction::Quit),
        KeyCode::Char(' ') => Some(KeyAction::TogglePause),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(KeyAction::Restart),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(KeyAction::NextStyle),
        KeyCode::Char('o') | KeyCode::Char('O') => Some(KeyAction::NextOpacity),
        _ => None,
    }
}

/// Drain pending key presses without blocking longer than `wait`.
fn poll_actions(wait: Duration) -> anyhow::Result<Vec<KeyAction>> {
    let mut actions = Vec::new();
    let mut timeout = wait;
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind != KeyEventKind::Release {
                actions.extend(key_action(k.code, k.modifiers));
            }
        }
        timeout = Duration::ZERO;
    }
    Ok(actions)
}

/// Letterboxes the canvas into the terminal and paints it with a HUD.
struct Presenter {
    out: BufWriter<Stdout>,
    session: TerminalSession,
    renderer: HalfBlockRenderer,
    letterbox: Letterbox,
    sync_updates: bool,
    last_size: (u16, u16),
}

impl Presenter {
    fn new(sync_updates: bool) -> anyhow::Result<Self> {
        let session = TerminalSession::enter()?;
        let last_size = session.size()?;
        Ok(Self {
            out: BufWriter::new(stdout()),
            session,
            renderer: HalfBlockRenderer::new(),
            letterbox: Letterbox::default(),
            sync_updates,
            last_size,
        })
    }

    fn present(&mut self, canvas: &Canvas, settings: &VisualSettings, hud: &str) -> anyhow::Result<()> {
        let (cols, rows) = self.session.size()?;
        if (cols, rows) != self.last_size {
            self.session.clear()?;
            self.last_size = (cols, rows);
        }
        if cols < 4 || rows < 2 {
            return Ok(());
        }

        let hud_rows = (hud.lines().count() as u16).min(rows - 1);
        let visual_rows = rows - hud_rows;
        let grid_w = cols as usize;
        let grid_h = visual_rows as usize * 2;
        let pixels = self.letterbox.compose(canvas, grid_w, grid_h, settings.bg_color);

        let frame = Frame {
            term_cols: cols,
            visual_rows,
            pixel_width: grid_w,
            pixel_height: grid_h,
            pixels_rgba: pixels,
            hud,
            hud_rows,
            sync_updates: self.sync_updates,
        };
        self.renderer.render(&frame, &mut self.out)
    }
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let settings = cfg.visual.resolve().context("resolve visual settings")?;
    if cfg.preview {
        return run_preview(&cfg, settings);
    }

    let path = cfg.audio.as_deref().context("no audio file given")?;
    let signal = Arc::new(
        decode_file(path).with_context(|| format!("decode {}", path.display()))?,
    );
    run_player(&cfg, settings, signal)
}

fn run_player(cfg: &Config, mut settings: VisualSettings, signal: Arc<DecodedAudio>) -> anyhow::Result<()> {
    let playback = Playback::new(Arc::clone(&signal), cfg.device.as_deref())
        .context("open audio output")?;
    let mut analyzer = LiveAnalyzer::with_source(Box::new(AnalyserSpectrum::new(
        Arc::clone(&signal),
        playback.playhead(),
    )));

    let mut presenter = Presenter::new(cfg.sync_updates)?;
    let (cw, ch) = settings.aspect_ratio.preview_size();
    let mut canvas = Canvas::new(cw, ch);
    let mut frames = FrameRenderer::new();
    let mut fps = FpsCounter::new();

    playback.play()?;
    let frame_budget = Duration::from_secs_f64(1.0 / settings.fps.max(1) as f64);

    loop {
        let tick = Instant::now();

        for action in poll_actions(Duration::ZERO)? {
            match action {
                KeyAction::Quit => {
                    playback.stop();
                    return Ok(());
                }
                KeyAction::TogglePause => {
                    if playback.is_paused() {
                        playback.resume();
                    } else {
                        playback.pause();
                    }
                }
                KeyAction::Restart => {
                    frames.reset();
                    analyzer.reset();
                    playback.play()?;
                }
                KeyAction::NextStyle => settings.style = settings.style.next(),
                KeyAction::NextOpacity => settings.opacity_mode = settings.opacity_mode.next(),
            }
        }

        if playback.is_finished() {
            info!("reached end of track");
            playback.stop();
            return Ok(());
        }

        let now_s = playback.current_time();
        let snapshot = analyzer.snapshot();
        frames.render_frame(&mut canvas, &settings, now_s, snapshot.as_ref(), Some(signal.as_ref()));

        fps.tick();
        let hud = build_hud(
            &settings,
            now_s,
            signal.duration_s(),
            playback.is_paused(),
            snapshot.as_ref(),
            fps.fps(),
        );
        presenter.present(&canvas, &settings, &hud)?;

        let elapsed = tick.elapsed();
        if elapsed < frame_budget {
            std::thread::sleep(frame_budget - elapsed);
        }
    }
}

fn run_preview(cfg: &Config, mut settings: VisualSettings) -> anyhow::Result<()> {
    let mut presenter = Presenter::new(cfg.sync_updates)?;
    let (cw, ch) = settings.aspect_ratio.preview_size();
    let mut canvas = Canvas::new(cw, ch);

    loop {
        render_preview(&mut canvas, &settings);
        let hud = format!(
            "preview | style: {} | opacity: {} | dot {}/{} | {} on {}\nKeys: s style | o opacity | q quit",
            settings.style.label(),
            settings.opacity_mode.label(),
            settings.dot_size,
            settings.dot_spacing,
            settings.dot_color,
            settings.bg_color,
        );
        presenter.present(&canvas, &settings, &hud)?;

        for action in poll_actions(Duration::from_millis(100))? {
            match action {
                KeyAction::Quit => return Ok(()),
                KeyAction::NextStyle => settings.style = settings.style.next(),
                KeyAction::NextOpacity => settings.opacity_mode = settings.opacity_mode.next(),
                KeyAction::TogglePause | KeyAction::Restart => {}
            }
        }
    }
}

fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn build_hud(
    settings: &VisualSettings,
    now_s: f64,
    duration_s: f64,
    paused: bool,
    snapshot: Option<&LiveAnalysisSnapshot>,
    fps: f32,
) -> String {
    let snap = snapshot.copied().unwrap_or_default();
    let b = snap.bands;
    format!(
        "{} | style: {} | opacity: {} | {} / {} | FPS: {:>4.1}\n\
         rms {:.2} | bass {:.2} | low-mid {:.2} | mid {:.2} | high-mid {:.2} | treble {:.2}\n\
         Keys: space pause | r restart | s style | o opacity | q quit",
        if paused { "paused" } else { "playing" },
        settings.style.label(),
        settings.opacity_mode.label(),
        format_clock(now_s),
        format_clock(duration_s),
        fps,
        snap.rms,
        b.bass,
        b.low_mid,
        b.mid,
        b.high_mid,
        b.treble,
    )
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = self.frames as f32 / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
