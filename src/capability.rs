use crate::error::{Result, StudioError};
use clap::ValueEnum;
use std::collections::HashSet;
use std::io;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    WebM,
    Mp4,
}

impl Container {
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebM => "webm",
            Self::Mp4 => "mp4",
        }
    }

    /// ffmpeg muxer name.
    pub fn muxer(self) -> &'static str {
        match self {
            Self::WebM => "webm",
            Self::Mp4 => "mp4",
        }
    }
}

/// A container plus the ffmpeg encoders that fill it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderPair {
    pub container: Container,
    pub video_encoder: &'static str,
    pub audio_encoder: &'static str,
    pub mime: &'static str,
}

/// WebM first: Opus keeps the audio track cleaner than AAC at the same rate.
pub const CANDIDATES: [EncoderPair; 3] = [
    EncoderPair {
        container: Container::WebM,
        video_encoder: "libvpx-vp9",
        audio_encoder: "libopus",
        mime: "video/webm;codecs=vp9,opus",
    },
    EncoderPair {
        container: Container::WebM,
        video_encoder: "libvpx",
        audio_encoder: "libopus",
        mime: "video/webm;codecs=vp8,opus",
    },
    EncoderPair {
        container: Container::Mp4,
        video_encoder: "libx264",
        audio_encoder: "aac",
        mime: "video/mp4;codecs=avc1,mp4a",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatPreference {
    Auto,
    Webm,
    Mp4,
}

/// Candidates in try order for `pref`. An explicit container moves its
/// candidates to the front; the rest stay as fallbacks.
pub fn candidate_order(pref: FormatPreference) -> Vec<EncoderPair> {
    let wanted = match pref {
        FormatPreference::Auto => return CANDIDATES.to_vec(),
        FormatPreference::Webm => Container::WebM,
        FormatPreference::Mp4 => Container::Mp4,
    };
    let (mut first, rest): (Vec<_>, Vec<_>) = CANDIDATES
        .iter()
        .copied()
        .partition(|c| c.container == wanted);
    first.extend(rest);
    first
}

/// What the local ffmpeg can encode.
#[derive(Debug, Clone, Default)]
pub struct ExportCapabilities {
    pub ffmpeg_version: String,
    encoders: HashSet<String>,
}

impl ExportCapabilities {
    pub fn from_parts(ffmpeg_version: impl Into<String>, encoders: HashSet<String>) -> Self {
        Self {
            ffmpeg_version: ffmpeg_version.into(),
            encoders,
        }
    }

    pub fn has_encoder(&self, name: &str) -> bool {
        self.encoders.contains(name)
    }

    pub fn supports(&self, pair: &EncoderPair) -> bool {
        self.has_encoder(pair.video_encoder) && self.has_encoder(pair.audio_encoder)
    }
}

/// Encoder names from `ffmpeg -encoders` output (rows after the `------` rule).
pub fn parse_encoder_list(text: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut in_table = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if !in_table {
            in_table = !trimmed.is_empty() && trimmed.chars().all(|c| c == '-');
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let (Some(flags), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        if flags.len() == 6 && matches!(flags.as_bytes()[0], b'V' | b'A' | b'S') {
            names.insert(name.to_string());
        }
    }
    names
}

fn run_ffmpeg(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StudioError::CaptureUnsupported(format!("{program} not found in PATH"))
            } else {
                StudioError::CaptureUnsupported(format!("failed to run {program}: {err}"))
            }
        })?;
    if !output.status.success() {
        return Err(StudioError::CaptureUnsupported(format!(
            "{program} {} exited with {}",
            args.join(" "),
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn probe_ffmpeg(program: &str) -> Result<ExportCapabilities> {
    let version = run_ffmpeg(program, &["-version"])?;
    let version = version.lines().next().unwrap_or_default().trim().to_string();
    let encoders = parse_encoder_list(&run_ffmpeg(program, &["-hide_banner", "-encoders"])?);
    debug!(count = encoders.len(), "probed ffmpeg encoders");
    Ok(ExportCapabilities::from_parts(version, encoders))
}

/// First supported candidate for `pref`.
pub fn negotiate(caps: &ExportCapabilities, pref: FormatPreference) -> Result<EncoderPair> {
    let order = candidate_order(pref);
    for (i, pair) in order.iter().enumerate() {
        if caps.supports(pair) {
            if i > 0 {
                warn!(
                    preferred = order[0].mime,
                    using = pair.mime,
                    "preferred encoders unavailable; falling back"
                );
            }
            info!(mime = pair.mime, "selected export format");
            return Ok(*pair);
        }
        debug!(mime = pair.mime, "encoders unavailable");
    }
    Err(StudioError::CaptureUnsupported(
        "no supported video/audio encoder pair (need VP9/VP8 with Opus, or H.264 with AAC)".to_string(),
    ))
}
