use std::fmt;

/// Failures surfaced by the analysis, rendering and export layers.
///
/// Out-of-range sample queries and reads from an analyzer with no audio are
/// not errors: they normalize to `0.0` and `None` respectively so a single bad
/// frame never interrupts the render loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioError {
    /// The audio bytes were rejected by the decoder (corrupt or unsupported).
    Decode(String),
    /// A capability required to start an export (or playback) is missing.
    CaptureUnsupported(String),
    /// An export session is already recording.
    ExportActive,
    /// Settings that would leave a render loop without forward progress.
    InvalidSettings(String),
    Io(String),
}

impl fmt::Display for StudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(msg) => write!(f, "failed to decode audio: {msg}"),
            Self::CaptureUnsupported(msg) => write!(f, "capture unsupported: {msg}"),
            Self::ExportActive => write!(f, "an export is already in progress"),
            Self::InvalidSettings(msg) => write!(f, "invalid visual settings: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for StudioError {}

impl From<std::io::Error> for StudioError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
