use crate::error::{Result, StudioError};
use crate::presets::{presets_storage_path, Preset, PresetStore};
use crate::visual::color::{OpacityLevels, Rgb};
use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug, Clone)]
#[command(name = "wavestudio", version, about = "Audio-reactive dot waveform player for the terminal")]
pub struct Config {
    /// Audio file to play (any format symphonia can decode).
    #[arg(value_name = "AUDIO", required_unless_present_any = ["preview", "list_devices", "save_preset", "delete_preset"])]
    pub audio: Option<PathBuf>,

    #[command(flatten)]
    pub visual: VisualArgs,

    /// Show the static settings preview instead of playing audio.
    #[arg(long, default_value_t = false)]
    pub preview: bool,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// Store the resolved visual settings as a user preset, then exit.
    #[arg(long, value_name = "NAME", conflicts_with = "delete_preset")]
    pub save_preset: Option<String>,

    /// Remove a user preset, then exit.
    #[arg(long, value_name = "NAME")]
    pub delete_preset: Option<String>,

    /// Output device name (case-insensitive substring).
    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Write logs here; without it only errors reach stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Visual overrides shared by the player and the exporter.
///
/// Resolution order: built-in defaults, then `--preset`, then explicit flags.
#[derive(Args, Debug, Clone, Default)]
pub struct VisualArgs {
    #[arg(long, value_enum)]
    pub style: Option<VisualStyle>,

    #[arg(long, value_enum)]
    pub opacity_mode: Option<OpacityMode>,

    #[arg(long)]
    pub dot_size: Option<f64>,

    #[arg(long)]
    pub dot_spacing: Option<f64>,

    /// Hex colour (`#rgb` or `#rrggbb`).
    #[arg(long)]
    pub dot_color: Option<String>,

    #[arg(long)]
    pub bg_color: Option<String>,

    /// Percent of half-height (or radius) the animation may reach.
    #[arg(long)]
    pub amplitude: Option<f64>,

    #[arg(long)]
    pub fps: Option<u32>,

    /// Seconds of audio visible across the scrolling view.
    #[arg(long)]
    pub window_size: Option<f64>,

    #[arg(long, value_enum)]
    pub aspect_ratio: Option<AspectRatio>,

    /// Named preset (user presets first, then built-ins).
    #[arg(long)]
    pub preset: Option<String>,

    #[arg(long)]
    pub presets_file: Option<PathBuf>,
}

impl VisualArgs {
    /// User preset file: `--presets-file`, else the per-user config location.
    pub fn presets_path(&self) -> Option<PathBuf> {
        self.presets_file.clone().or_else(presets_storage_path)
    }

    pub fn resolve(&self) -> anyhow::Result<VisualSettings> {
        let mut settings = VisualSettings::default();

        if let Some(name) = self.preset.as_deref() {
            let path = self.presets_path();
            let store = PresetStore::load(path.as_deref()).context("load preset file")?;
            let preset = store
                .find(name)
                .ok_or_else(|| anyhow!("unknown preset: {name}"))?;
            settings = preset.settings.clone();
        }

        self.apply_overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    /// Resolve the current settings and store them under `name`, replacing a
    /// user preset of the same name. Returns the file written.
    pub fn save_preset(&self, name: &str) -> anyhow::Result<PathBuf> {
        let name = name.trim();
        if name.is_empty() || name.contains(['[', ']', '\n', '\r']) {
            bail!("invalid preset name: {name:?}");
        }
        let path = self
            .presets_path()
            .context("no location for user presets (set --presets-file or HOME)")?;
        let settings = self.resolve()?;

        let mut store = PresetStore::load(Some(&path)).context("load preset file")?;
        store.upsert(Preset {
            name: name.to_string(),
            settings,
        });
        store.save(Some(&path)).context("save preset file")?;
        info!(preset = name, path = %path.display(), "saved preset");
        Ok(path)
    }

    /// Remove user preset `name` (exact match). Built-ins cannot be removed;
    /// returns false when the file has no such preset.
    pub fn delete_preset(&self, name: &str) -> anyhow::Result<bool> {
        let Some(path) = self.presets_path() else {
            return Ok(false);
        };
        let mut store = PresetStore::load(Some(&path)).context("load preset file")?;
        if !store.remove(name.trim()) {
            return Ok(false);
        }
        store.save(Some(&path)).context("save preset file")?;
        info!(preset = name.trim(), path = %path.display(), "deleted preset");
        Ok(true)
    }

    pub fn apply_overrides(&self, s: &mut VisualSettings) {
        if let Some(v) = self.style {
            s.style = v;
        }
        if let Some(v) = self.opacity_mode {
            s.opacity_mode = v;
        }
        if let Some(v) = self.dot_size {
            s.dot_size = v;
        }
        if let Some(v) = self.dot_spacing {
            s.dot_spacing = v;
        }
        if let Some(v) = self.dot_color.as_deref() {
            s.dot_color = Rgb::from_hex_lossy(v);
        }
        if let Some(v) = self.bg_color.as_deref() {
            s.bg_color = Rgb::from_hex_lossy(v);
        }
        if let Some(v) = self.amplitude {
            s.amplitude = v;
        }
        if let Some(v) = self.fps {
            s.fps = v;
        }
        if let Some(v) = self.window_size {
            s.window_size = v;
        }
        if let Some(v) = self.aspect_ratio {
            s.aspect_ratio = v;
        }
    }
}

/// Fully resolved options for one render call.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualSettings {
    pub style: VisualStyle,
    pub opacity_mode: OpacityMode,
    pub dot_size: f64,
    pub dot_spacing: f64,
    pub dot_color: Rgb,
    pub bg_color: Rgb,
    pub amplitude: f64,
    pub fps: u32,
    pub window_size: f64,
    pub aspect_ratio: AspectRatio,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            style: VisualStyle::Scrolling,
            opacity_mode: OpacityMode::Uniform,
            dot_size: 6.0,
            dot_spacing: 6.0,
            dot_color: Rgb::new(0x00, 0xd2, 0xff),
            bg_color: Rgb::BLACK,
            amplitude: 60.0,
            fps: 30,
            window_size: 2.0,
            aspect_ratio: AspectRatio::Wide,
        }
    }
}

impl VisualSettings {
    /// Reject values that would stall a render or export loop.
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(StudioError::InvalidSettings(msg));
        if !(self.dot_size.is_finite() && self.dot_size > 0.0) {
            return bad(format!("dot size must be positive, got {}", self.dot_size));
        }
        if !(self.dot_spacing.is_finite() && self.dot_spacing > 0.0) {
            return bad(format!("dot spacing must be positive, got {}", self.dot_spacing));
        }
        if self.fps == 0 {
            return bad("fps must be at least 1".to_string());
        }
        if !self.amplitude.is_finite() {
            return bad("amplitude must be finite".to_string());
        }
        if !(self.window_size.is_finite() && self.window_size >= 0.0) {
            return bad(format!("window size must be non-negative, got {}", self.window_size));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VisualStyle {
    Scrolling,
    Breathing,
    Radial,
    Bars,
}

impl VisualStyle {
    pub const fn all() -> [Self; 4] {
        [Self::Scrolling, Self::Breathing, Self::Radial, Self::Bars]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Scrolling => "scrolling",
            Self::Breathing => "breathing",
            Self::Radial => "radial",
            Self::Bars => "bars",
        }
    }

    /// Unrecognized names render as scrolling.
    pub fn from_name_lossy(name: &str) -> Self {
        Self::all()
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(Self::Scrolling)
    }

    pub fn next(self) -> Self {
        let all = Self::all();
        let idx = all.iter().position(|&s| s == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OpacityMode {
    Uniform,
    #[value(name = "3_levels", alias = "3")]
    ThreeLevels,
    #[value(name = "5_levels", alias = "5")]
    FiveLevels,
    #[value(name = "10_levels", alias = "10")]
    TenLevels,
}

impl OpacityMode {
    pub const fn all() -> [Self; 4] {
        [Self::Uniform, Self::ThreeLevels, Self::FiveLevels, Self::TenLevels]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::ThreeLevels => "3_levels",
            Self::FiveLevels => "5_levels",
            Self::TenLevels => "10_levels",
        }
    }

    /// Unrecognized names fall back to uniform.
    pub fn from_name_lossy(name: &str) -> Self {
        Self::all()
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(Self::Uniform)
    }

    /// `None` in uniform mode, where dots keep their plain colour.
    pub fn levels(self) -> Option<OpacityLevels> {
        match self {
            Self::Uniform => None,
            Self::ThreeLevels => Some(OpacityLevels::Three),
            Self::FiveLevels => Some(OpacityLevels::Five),
            Self::TenLevels => Some(OpacityLevels::Ten),
        }
    }

    pub fn next(self) -> Self {
        let all = Self::all();
        let idx = all.iter().position(|&m| m == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AspectRatio {
    #[value(name = "16:9", alias = "wide", alias = "landscape")]
    Wide,
    #[value(name = "9:16", alias = "tall", alias = "portrait")]
    Tall,
    #[value(name = "1:1", alias = "square")]
    Square,
}

impl AspectRatio {
    pub fn label(self) -> &'static str {
        match self {
            Self::Wide => "16:9",
            Self::Tall => "9:16",
            Self::Square => "1:1",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "16:9" => Some(Self::Wide),
            "9:16" => Some(Self::Tall),
            "1:1" => Some(Self::Square),
            _ => None,
        }
    }

    /// Canvas size used for live playback and previews.
    pub fn preview_size(self) -> (usize, usize) {
        match self {
            Self::Wide => (960, 540),
            Self::Tall => (337, 600),
            Self::Square => (600, 600),
        }
    }

    pub fn export_size(self, quality: ExportQuality) -> (usize, usize) {
        let short = match quality {
            ExportQuality::Sd => 480,
            ExportQuality::Hd => 720,
            ExportQuality::FullHd => 1080,
        };
        let long = match quality {
            ExportQuality::Sd => 854,
            ExportQuality::Hd => 1280,
            ExportQuality::FullHd => 1920,
        };
        match self {
            Self::Wide => (long, short),
            Self::Tall => (short, long),
            Self::Square => (short, short),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportQuality {
    #[value(alias = "480p")]
    Sd,
    #[value(alias = "720p")]
    Hd,
    #[value(name = "full-hd", alias = "fullhd", alias = "1080p")]
    FullHd,
}
