use std::fmt;

/// Colour used when a hex string cannot be parsed.
pub const FALLBACK_DOT_COLOR: Rgb = Rgb::new(0, 210, 255);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` / `#rrggbb`, with or without the leading `#`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let mut it = hex.chars().map(|c| c.to_digit(16).unwrap_or(0) as u8);
                let r = it.next()?;
                let g = it.next()?;
                let b = it.next()?;
                Some(Self::new(r * 17, g * 17, b * 17))
            }
            6 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
                Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
            }
            _ => None,
        }
    }

    pub fn from_hex_lossy(s: &str) -> Self {
        Self::parse_hex(s).unwrap_or(FALLBACK_DOT_COLOR)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// `bg * (1 - opacity) + self * opacity` per channel, rounded.
    pub fn blend_over(self, bg: Rgb, opacity: f64) -> Rgb {
        let mix = |fg: u8, bg: u8| {
            let v = bg as f64 * (1.0 - opacity) + fg as f64 * opacity;
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgb::new(mix(self.r, bg.r), mix(self.g, bg.g), mix(self.b, bg.b))
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Number of discrete opacity steps a dot can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpacityLevels {
    Three,
    Five,
    Ten,
}

impl OpacityLevels {
    pub fn count(self) -> u32 {
        match self {
            Self::Three => 3,
            Self::Five => 5,
            Self::Ten => 10,
        }
    }
}

/// Snap a continuous amplitude to one of the fixed opacity steps.
///
/// Bucket edges are inclusive (`<=`). Ten-level mode never returns less than
/// 0.1, so a dot drawn in that mode is never fully hidden.
pub fn quantize_opacity(amplitude: f64, levels: OpacityLevels) -> f64 {
    let opacity = match levels {
        OpacityLevels::Three => {
            if amplitude <= 0.15 {
                0.0
            } else if amplitude <= 0.65 {
                0.5
            } else {
                1.0
            }
        }
        OpacityLevels::Five => {
            if amplitude <= 0.05 {
                0.0
            } else if amplitude <= 0.25 {
                0.25
            } else if amplitude <= 0.5 {
                0.5
            } else if amplitude <= 0.75 {
                0.75
            } else {
                1.0
            }
        }
        OpacityLevels::Ten => {
            const EDGES: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];
            let step = EDGES
                .iter()
                .position(|&edge| amplitude <= edge)
                .unwrap_or(EDGES.len());
            (step + 1) as f64 / 10.0
        }
    };

    if levels == OpacityLevels::Ten {
        opacity.max(0.1)
    } else {
        opacity
    }
}

/// Colour of a dot at `amplitude` after quantizing to `levels` steps.
pub fn discrete_opacity_color(base: Rgb, bg: Rgb, amplitude: f64, levels: OpacityLevels) -> Rgb {
    let opacity = quantize_opacity(amplitude, levels);
    if opacity <= 0.0 {
        return bg;
    }
    base.blend_over(bg, opacity)
}
