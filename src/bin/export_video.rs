use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use wavestudio::audio::decode_file;
use wavestudio::capability::{negotiate, probe_ffmpeg, FormatPreference};
use wavestudio::config::{ExportQuality, VisualArgs};
use wavestudio::export::{render_frames, EnvelopeFeed, EnvelopeSource, ExportPlan, ExportSession};
use wavestudio::logging::{self, LogSink};

const DEFAULT_STEM: &str = "waveform";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "export_video",
    version,
    about = "Offline waveform export (audio file -> WebM/MP4 via ffmpeg)"
)]
pub(crate) struct Cli {
    #[arg(long, value_name = "AUDIO")]
    pub(crate) audio: PathBuf,

    /// Defaults to `waveform.<ext>` for the negotiated container.
    #[arg(long, value_name = "FILE")]
    pub(crate) out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ExportQuality::Hd)]
    pub(crate) quality: ExportQuality,

    #[arg(long, value_enum, default_value_t = FormatPreference::Auto)]
    pub(crate) format: FormatPreference,

    /// Cap on exported audio, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub(crate) duration: Option<f64>,

    #[arg(long, value_enum, default_value_t = EnvelopeSource::Live)]
    pub(crate) envelope: EnvelopeSource,

    #[arg(long, default_value = "ffmpeg")]
    pub(crate) ffmpeg: String,

    #[arg(long, default_value = "info")]
    pub(crate) log_level: String,

    #[command(flatten)]
    pub(crate) visual: VisualArgs,
}

pub(crate) fn default_output_path(extension: &str) -> PathBuf {
    PathBuf::from(format!("{DEFAULT_STEM}.{extension}"))
}

pub(crate) fn validate_args(args: &Cli) -> Result<()> {
    if args.visual.fps == Some(0) {
        bail!("--fps must be >= 1");
    }
    if let Some(cap) = args.duration {
        if cap <= 0.0 {
            bail!("--duration must be > 0 seconds");
        }
    }
    if args.ffmpeg.trim().is_empty() {
        bail!("--ffmpeg must name a program");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    logging::init(&args.log_level, LogSink::Stderr)?;
    run(args)
}

fn run(args: Cli) -> Result<()> {
    validate_args(&args)?;
    let settings = args.visual.resolve().context("resolve visual settings")?;

    let caps = probe_ffmpeg(&args.ffmpeg)?;
    info!(version = %caps.ffmpeg_version, "found ffmpeg");
    let encoder = negotiate(&caps, args.format)?;

    let signal = Arc::new(
        decode_file(&args.audio).with_context(|| format!("decode {}", args.audio.display()))?,
    );
    if signal.is_empty() {
        bail!("audio had no samples");
    }

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| default_output_path(encoder.container.extension()));
    let mut parent = out.parent().unwrap_or_else(|| Path::new(""));
    if parent == Path::new("") {
        parent = Path::new(".");
    }
    fs::create_dir_all(parent)
        .with_context(|| format!("create output directory {}", parent.display()))?;

    let plan = ExportPlan::new(
        encoder,
        settings.aspect_ratio.export_size(args.quality),
        settings.fps,
        signal.duration_s(),
        args.duration,
        args.audio.clone(),
        out,
        args.ffmpeg.clone(),
    )?;

    let mut feed = EnvelopeFeed::new(args.envelope, &signal, settings.fps);
    let mut session = ExportSession::new();
    session.start(&plan)?;
    if let Err(err) = render_frames(&plan, &settings, &signal, &mut feed, &mut session) {
        session.stop();
        return Err(err).context("render frames");
    }
    let frames = session.finish().context("finish export")?;

    println!(
        "exported {} frames @ {} fps ({}x{}, {:.3}s, {}) -> {}",
        frames,
        plan.fps,
        plan.width,
        plan.height,
        plan.deadline_s,
        plan.encoder.mime,
        plan.out_path.display()
    );
    Ok(())
}
