use crate::config::{AspectRatio, OpacityMode, VisualSettings, VisualStyle};
use crate::visual::color::Rgb;
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Named, fully specified visual settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub settings: VisualSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    Io(String),
    Parse { line: usize, message: String },
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse { line, message } => write!(f, "parse error at line {line}: {message}"),
        }
    }
}

impl std::error::Error for PresetError {}

pub fn builtin_presets() -> Vec<Preset> {
    let base = VisualSettings::default();
    vec![
        Preset {
            name: "Classic Wave".to_string(),
            settings: base.clone(),
        },
        Preset {
            name: "Neon Pulse".to_string(),
            settings: VisualSettings {
                style: VisualStyle::Breathing,
                opacity_mode: OpacityMode::FiveLevels,
                dot_size: 8.0,
                dot_spacing: 8.0,
                dot_color: Rgb::new(0xff, 0x00, 0x80),
                bg_color: Rgb::new(0x0a, 0x0a, 0x12),
                amplitude: 80.0,
                ..base.clone()
            },
        },
        Preset {
            name: "Retro Bars".to_string(),
            settings: VisualSettings {
                style: VisualStyle::Bars,
                opacity_mode: OpacityMode::ThreeLevels,
                dot_size: 4.0,
                dot_spacing: 12.0,
                dot_color: Rgb::new(0xff, 0xff, 0x00),
                bg_color: Rgb::new(0x2a, 0x08, 0x45),
                amplitude: 70.0,
                ..base
            },
        },
    ]
}

/// User presets backed by a plain-text file of `[name]` sections.
///
/// ```text
/// [Late Night]
/// style=radial
/// dot_color=#ffaa00
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetStore {
    presets: Vec<Preset>,
}

impl PresetStore {
    /// Load from `path`. A missing path or file yields an empty store.
    pub fn load(path: Option<&Path>) -> Result<Self, PresetError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = match std::fs::read_to_string(path) {
            Ok(v) => v,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no user preset file");
                return Ok(Self::default());
            }
            Err(err) => return Err(PresetError::Io(err.to_string())),
        };

        let store = Self::parse(&text)?;
        info!(path = %path.display(), count = store.presets.len(), "loaded user presets");
        Ok(store)
    }

    pub fn parse(text: &str) -> Result<Self, PresetError> {
        let mut store = Self::default();
        let mut current: Option<Preset> = None;

        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(name) = rest.strip_suffix(']').map(str::trim) else {
                    return Err(PresetError::Parse {
                        line: line_no,
                        message: "expected [name]".to_string(),
                    });
                };
                if name.is_empty() {
                    return Err(PresetError::Parse {
                        line: line_no,
                        message: "preset name must not be empty".to_string(),
                    });
                }
                if let Some(done) = current.take() {
                    store.upsert(done);
                }
                current = Some(Preset {
                    name: name.to_string(),
                    settings: VisualSettings::default(),
                });
                continue;
            }

            let Some((key_raw, value_raw)) = line.split_once('=') else {
                return Err(PresetError::Parse {
                    line: line_no,
                    message: "expected <key>=<value>".to_string(),
                });
            };
            let Some(preset) = current.as_mut() else {
                return Err(PresetError::Parse {
                    line: line_no,
                    message: "setting outside of a [name] section".to_string(),
                });
            };
            apply_key(&mut preset.settings, key_raw.trim(), value_raw.trim()).map_err(|message| {
                PresetError::Parse {
                    line: line_no,
                    message,
                }
            })?;
        }

        if let Some(done) = current.take() {
            store.upsert(done);
        }
        Ok(store)
    }

    pub fn to_text(&self) -> String {
        let mut body = String::from("# wavestudio presets v1\n");
        for p in &self.presets {
            let s = &p.settings;
            let _ = write!(
                body,
                "\n[{}]\nstyle={}\nopacity_mode={}\ndot_size={}\ndot_spacing={}\ndot_color={}\nbg_color={}\namplitude={}\nfps={}\nwindow_size={}\naspect_ratio={}\n",
                p.name,
                s.style.label(),
                s.opacity_mode.label(),
                s.dot_size,
                s.dot_spacing,
                s.dot_color.to_hex(),
                s.bg_color.to_hex(),
                s.amplitude,
                s.fps,
                s.window_size,
                s.aspect_ratio.label(),
            );
        }
        body
    }

    /// Write atomically (temp file, then rename).
    pub fn save(&self, path: Option<&Path>) -> Result<(), PresetError> {
        let Some(path) = path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PresetError::Io(e.to_string()))?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_text()).map_err(|e| PresetError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| PresetError::Io(e.to_string()))
    }

    /// Insert, or replace the preset with the same (case-sensitive) name.
    pub fn upsert(&mut self, preset: Preset) {
        match self.presets.iter_mut().find(|p| p.name == preset.name) {
            Some(slot) => *slot = preset,
            None => self.presets.push(preset),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.presets.len();
        self.presets.retain(|p| p.name != name);
        self.presets.len() != before
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// Exact name first, then case-insensitive substring; user presets are
    /// searched before the built-ins.
    pub fn find(&self, query: &str) -> Option<Preset> {
        let builtins = builtin_presets();
        let all = || self.presets.iter().chain(builtins.iter());
        if let Some(p) = all().find(|p| p.name == query) {
            return Some(p.clone());
        }
        let want = query.trim().to_lowercase();
        if want.is_empty() {
            return None;
        }
        all().find(|p| p.name.to_lowercase().contains(&want)).cloned()
    }
}

fn apply_key(s: &mut VisualSettings, key: &str, value: &str) -> Result<(), String> {
    let number = |v: &str| {
        v.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("{key} must be a number"))
    };
    match key {
        "style" => s.style = VisualStyle::from_name_lossy(value),
        "opacity_mode" => s.opacity_mode = OpacityMode::from_name_lossy(value),
        "dot_size" => s.dot_size = number(value)?,
        "dot_spacing" => s.dot_spacing = number(value)?,
        "dot_color" => s.dot_color = Rgb::from_hex_lossy(value),
        "bg_color" => s.bg_color = Rgb::from_hex_lossy(value),
        "amplitude" => s.amplitude = number(value)?,
        "fps" => {
            s.fps = value
                .parse::<u32>()
                .map_err(|_| "fps must be a whole number".to_string())?;
        }
        "window_size" => s.window_size = number(value)?,
        "aspect_ratio" => {
            s.aspect_ratio =
                AspectRatio::from_name(value).ok_or_else(|| format!("unknown aspect ratio: {value}"))?;
        }
        _ => {}
    }
    Ok(())
}

pub fn presets_storage_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("wavestudio").join("presets.txt"));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("wavestudio")
            .join("presets.txt"),
    )
}
