use crate::analyzer::{LiveAnalysisSnapshot, LiveAnalyzer};
use crate::audio::DecodedAudio;
use crate::capability::{Container, EncoderPair};
use crate::config::VisualSettings;
use crate::error::{Result, StudioError};
use crate::playback::Playhead;
use crate::sampler::sample_for_visualization;
use crate::spectrum::AnalyserSpectrum;
use crate::visual::{Canvas, FrameRenderer};
use clap::ValueEnum;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const AUDIO_BITRATE_BPS: u32 = 320_000;
/// Extra media kept after the track ends so the tail is not clipped.
pub const STOP_BUFFER_S: f64 = 0.5;

/// Target video bitrate from the pixel rate `w * h * fps`.
pub fn video_bitrate_bps(width: usize, height: usize, fps: u32) -> u32 {
    let pixel_rate = width as u64 * height as u64 * fps as u64;
    if pixel_rate > 2_073_600 {
        8_000_000
    } else if pixel_rate > 1_036_800 {
        5_000_000
    } else if pixel_rate > 518_400 {
        2_500_000
    } else {
        1_000_000
    }
}

/// Auto-stop point: the (optionally capped) track duration plus [`STOP_BUFFER_S`].
pub fn export_deadline_s(audio_duration_s: f64, cap_s: Option<f64>) -> f64 {
    let base = audio_duration_s.max(0.0);
    let base = match cap_s {
        Some(cap) => base.min(cap.max(0.0)),
        None => base,
    };
    base + STOP_BUFFER_S
}

pub fn frame_count(deadline_s: f64, fps: u32) -> usize {
    ((deadline_s.max(0.0) * fps as f64).floor() as usize).max(1)
}

pub fn frame_time(frame: usize, fps: u32) -> f64 {
    frame as f64 / fps.max(1) as f64
}

/// `min(elapsed / duration, 1)`; an empty track counts as done.
pub fn progress(elapsed_s: f64, duration_s: f64) -> f64 {
    if duration_s <= 0.0 {
        return 1.0;
    }
    (elapsed_s / duration_s).clamp(0.0, 1.0)
}

/// Everything needed to launch one encoder run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPlan {
    pub width: usize,
    pub height: usize,
    pub fps: u32,
    pub media_duration_s: f64,
    pub deadline_s: f64,
    pub frame_count: usize,
    pub video_bitrate_bps: u32,
    pub audio_bitrate_bps: u32,
    pub encoder: EncoderPair,
    pub audio_path: PathBuf,
    pub out_path: PathBuf,
    pub ffmpeg: String,
}

impl ExportPlan {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        encoder: EncoderPair,
        (width, height): (usize, usize),
        fps: u32,
        audio_duration_s: f64,
        cap_s: Option<f64>,
        audio_path: PathBuf,
        out_path: PathBuf,
        ffmpeg: impl Into<String>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(StudioError::InvalidSettings(format!(
                "export size {width}x{height} is empty"
            )));
        }
        if fps == 0 {
            return Err(StudioError::InvalidSettings("fps must be >= 1".to_string()));
        }
        let deadline_s = export_deadline_s(audio_duration_s, cap_s);
        let media_duration_s = deadline_s - STOP_BUFFER_S;
        Ok(Self {
            width,
            height,
            fps,
            media_duration_s,
            deadline_s,
            frame_count: frame_count(deadline_s, fps),
            video_bitrate_bps: video_bitrate_bps(width, height, fps),
            audio_bitrate_bps: AUDIO_BITRATE_BPS,
            encoder,
            audio_path,
            out_path,
            ffmpeg: ffmpeg.into(),
        })
    }

    pub fn frame_bytes(&self) -> usize {
        self.width * self.height * 4
    }

    /// Raw RGBA frames on stdin, the original file as the audio input.
    pub fn ffmpeg_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-video_size",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(format!("{}x{}", self.width, self.height).into());
        args.push("-framerate".into());
        args.push(self.fps.to_string().into());
        args.push("-i".into());
        args.push("-".into());
        args.push("-i".into());
        args.push(self.audio_path.clone().into());
        for arg in [
            "-map",
            "0:v:0",
            "-map",
            "1:a:0",
            "-c:v",
            self.encoder.video_encoder,
            "-pix_fmt",
            "yuv420p",
        ] {
            args.push(arg.into());
        }
        args.push("-b:v".into());
        args.push(self.video_bitrate_bps.to_string().into());
        args.push("-c:a".into());
        args.push(self.encoder.audio_encoder.into());
        args.push("-b:a".into());
        args.push(format!("{}k", self.audio_bitrate_bps / 1000).into());
        args.push("-t".into());
        args.push(format!("{:.6}", self.deadline_s).into());
        args.push("-f".into());
        args.push(self.encoder.container.muxer().into());
        if self.encoder.container == Container::Mp4 {
            args.push("-movflags".into());
            args.push("+faststart".into());
        }
        args.push(self.out_path.clone().into());
        args
    }
}

/// Anything that consumes rendered RGBA frames.
pub trait FrameSink {
    fn push_frame(&mut self, rgba: &[u8]) -> Result<()>;
}

struct Recording {
    child: Child,
    stdin: Option<ChildStdin>,
    frame_bytes: usize,
    frames_written: usize,
}

/// One encoder child process at a time.
///
/// The child and its stdin pipe are released on every path: `finish`,
/// `stop`, or drop.
#[derive(Default)]
pub struct ExportSession {
    active: Option<Recording>,
}

impl ExportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn frames_written(&self) -> usize {
        self.active.as_ref().map_or(0, |r| r.frames_written)
    }

    pub fn start(&mut self, plan: &ExportPlan) -> Result<()> {
        if self.active.is_some() {
            return Err(StudioError::ExportActive);
        }
        let mut child = Command::new(&plan.ffmpeg)
            .args(plan.ffmpeg_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => {
                    StudioError::CaptureUnsupported(format!("{} not found in PATH", plan.ffmpeg))
                }
                _ => StudioError::Io(format!("spawn {}: {err}", plan.ffmpeg)),
            })?;
        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(StudioError::Io("encoder stdin unavailable".to_string()));
        };
        info!(
            out = %plan.out_path.display(),
            size = %format!("{}x{}", plan.width, plan.height),
            fps = plan.fps,
            frames = plan.frame_count,
            mime = plan.encoder.mime,
            "export started"
        );
        self.active = Some(Recording {
            child,
            stdin: Some(stdin),
            frame_bytes: plan.frame_bytes(),
            frames_written: 0,
        });
        Ok(())
    }

    /// Close the input, wait for the encoder and return the frame count.
    pub fn finish(&mut self) -> Result<usize> {
        let Some(mut rec) = self.active.take() else {
            return Err(StudioError::Io("no export in progress".to_string()));
        };
        drop(rec.stdin.take());
        let status = rec.child.wait()?;
        if !status.success() {
            return Err(StudioError::Io(format!("encoder exited with {status}")));
        }
        info!(frames = rec.frames_written, "export finished");
        Ok(rec.frames_written)
    }

    /// Abort any running export. A no-op when nothing is recording.
    pub fn stop(&mut self) {
        let Some(mut rec) = self.active.take() else {
            return;
        };
        drop(rec.stdin.take());
        if let Err(err) = rec.child.kill() {
            debug!(%err, "encoder already exited");
        }
        if let Err(err) = rec.child.wait() {
            warn!(%err, "failed to reap encoder");
        }
        info!(frames = rec.frames_written, "export stopped");
    }
}

impl FrameSink for ExportSession {
    fn push_frame(&mut self, rgba: &[u8]) -> Result<()> {
        let rec = self
            .active
            .as_mut()
            .ok_or_else(|| StudioError::Io("no export in progress".to_string()))?;
        if rgba.len() != rec.frame_bytes {
            return Err(StudioError::Io(format!(
                "frame is {} bytes, expected {}",
                rgba.len(),
                rec.frame_bytes
            )));
        }
        let stdin = rec
            .stdin
            .as_mut()
            .ok_or_else(|| StudioError::Io("encoder input closed".to_string()))?;
        stdin.write_all(rgba)?;
        rec.frames_written += 1;
        Ok(())
    }
}

impl Drop for ExportSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Which amplitude estimate drives the exported frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EnvelopeSource {
    /// Analyser spectrum at the frame's playhead position.
    #[default]
    Live,
    /// Normalized per-frame RMS computed up front.
    Offline,
}

/// Per-frame features for export; the two sources are kept separate.
pub enum EnvelopeFeed {
    Live {
        analyzer: LiveAnalyzer,
        playhead: Arc<Playhead>,
    },
    Offline {
        track: Vec<f32>,
    },
}

impl EnvelopeFeed {
    pub fn new(source: EnvelopeSource, signal: &Arc<DecodedAudio>, fps: u32) -> Self {
        match source {
            EnvelopeSource::Live => {
                let playhead = Arc::new(Playhead::new(signal.sample_rate()));
                let spectrum = AnalyserSpectrum::new(Arc::clone(signal), Arc::clone(&playhead));
                Self::Live {
                    analyzer: LiveAnalyzer::with_source(Box::new(spectrum)),
                    playhead,
                }
            }
            EnvelopeSource::Offline => Self::Offline {
                track: sample_for_visualization(signal, fps),
            },
        }
    }

    pub fn snapshot_at(&mut self, frame: usize, time_s: f64) -> Option<LiveAnalysisSnapshot> {
        match self {
            Self::Live { analyzer, playhead } => {
                playhead.seek(time_s);
                analyzer.snapshot()
            }
            Self::Offline { track } => {
                let last = track.len().checked_sub(1)?;
                Some(LiveAnalysisSnapshot {
                    rms: track[frame.min(last)],
                    ..LiveAnalysisSnapshot::default()
                })
            }
        }
    }
}

/// Render `plan.frame_count` frames on the clock `t = frame / fps` into `sink`.
pub fn render_frames(
    plan: &ExportPlan,
    settings: &VisualSettings,
    signal: &DecodedAudio,
    feed: &mut EnvelopeFeed,
    sink: &mut dyn FrameSink,
) -> Result<usize> {
    let mut canvas = Canvas::new(plan.width, plan.height);
    let mut renderer = FrameRenderer::new();
    let report_every = plan.fps.max(1) as usize;

    for frame in 0..plan.frame_count {
        let t = frame_time(frame, plan.fps);
        let snapshot = feed.snapshot_at(frame, t);
        renderer.render_frame(&mut canvas, settings, t, snapshot.as_ref(), Some(signal));
        sink.push_frame(canvas.as_rgba())?;

        if frame > 0 && frame % report_every == 0 {
            info!(
                progress = progress(t, plan.media_duration_s),
                frame,
                "export progress"
            );
        }
    }
    info!(progress = 1.0, frames = plan.frame_count, "export progress");
    Ok(plan.frame_count)
}
