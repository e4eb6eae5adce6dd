#[allow(dead_code)]
#[path = "../src/bin/export_video.rs"]
mod export_video;

use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use wavestudio::audio::DecodedAudio;
use wavestudio::capability::{
    candidate_order, negotiate, Container, ExportCapabilities, FormatPreference, CANDIDATES,
};
use wavestudio::config::{AspectRatio, ExportQuality, VisualSettings, VisualStyle};
use wavestudio::error::{Result as StudioResult, StudioError};
use wavestudio::export::{
    export_deadline_s, frame_count, frame_time, progress, render_frames, video_bitrate_bps,
    EnvelopeFeed, EnvelopeSource, ExportPlan, ExportSession, FrameSink, AUDIO_BITRATE_BPS,
};

fn caps(names: &[&str]) -> ExportCapabilities {
    let set: HashSet<String> = names.iter().map(|s| s.to_string()).collect();
    ExportCapabilities::from_parts("ffmpeg version test", set)
}

/// Collects frames instead of piping them to an encoder.
#[derive(Default)]
struct FrameLog {
    frames: Vec<Vec<u8>>,
}

impl FrameSink for FrameLog {
    fn push_frame(&mut self, rgba: &[u8]) -> StudioResult<()> {
        self.frames.push(rgba.to_vec());
        Ok(())
    }
}

fn small_plan(duration_s: f64, fps: u32) -> ExportPlan {
    ExportPlan::new(
        CANDIDATES[0],
        (32, 18),
        fps,
        duration_s,
        None,
        PathBuf::from("in.wav"),
        PathBuf::from("out.webm"),
        "ffmpeg",
    )
    .expect("plan")
}

// ── CLI ─────────────────────────────────────────────────────────────────────

#[test]
fn parse_args_defaults_are_stable() {
    let args = export_video::Cli::try_parse_from(["export_video", "--audio", "input.mp3"])
        .expect("parse should succeed");

    assert_eq!(args.audio, PathBuf::from("input.mp3"));
    assert_eq!(args.out, None);
    assert_eq!(args.quality, ExportQuality::Hd);
    assert_eq!(args.format, FormatPreference::Auto);
    assert_eq!(args.duration, None);
    assert_eq!(args.envelope, EnvelopeSource::Live);
    assert_eq!(args.ffmpeg, "ffmpeg");
    assert_eq!(args.visual.style, None);
}

#[test]
fn parse_args_overrides_work() {
    let args = export_video::Cli::try_parse_from([
        "export_video",
        "--audio",
        "song.flac",
        "--out",
        "clips/out.mp4",
        "--quality",
        "full-hd",
        "--format",
        "mp4",
        "--duration",
        "12.5",
        "--envelope",
        "offline",
        "--style",
        "bars",
        "--opacity-mode",
        "3_levels",
        "--aspect-ratio",
        "9:16",
        "--fps",
        "60",
        "--preset",
        "retro",
    ])
    .expect("parse should succeed");

    assert_eq!(args.out, Some(PathBuf::from("clips/out.mp4")));
    assert_eq!(args.quality, ExportQuality::FullHd);
    assert_eq!(args.format, FormatPreference::Mp4);
    assert_eq!(args.duration, Some(12.5));
    assert_eq!(args.envelope, EnvelopeSource::Offline);
    assert_eq!(args.visual.style, Some(VisualStyle::Bars));
    assert_eq!(args.visual.aspect_ratio, Some(AspectRatio::Tall));
    assert_eq!(args.visual.fps, Some(60));
    assert_eq!(args.visual.preset.as_deref(), Some("retro"));
    export_video::validate_args(&args).expect("valid");
}

#[test]
fn validate_rejects_zero_fps_and_bad_duration() {
    let args = export_video::Cli::try_parse_from(["export_video", "--audio", "a.wav", "--fps", "0"])
        .expect("parse should succeed");
    let err = export_video::validate_args(&args).expect_err("fps=0 must fail validation");
    assert!(err.to_string().contains("--fps"));

    let args =
        export_video::Cli::try_parse_from(["export_video", "--audio", "a.wav", "--duration", "0"])
            .expect("parse should succeed");
    let err = export_video::validate_args(&args).expect_err("duration=0 must fail");
    assert!(err.to_string().contains("--duration"));
}

#[test]
fn default_output_uses_negotiated_extension() {
    assert_eq!(
        export_video::default_output_path(Container::WebM.extension()),
        PathBuf::from("waveform.webm")
    );
    assert_eq!(
        export_video::default_output_path(Container::Mp4.extension()),
        PathBuf::from("waveform.mp4")
    );
}

// ── Sizes, bitrates, deadlines ──────────────────────────────────────────────

#[test]
fn export_sizes_follow_aspect_and_quality() {
    assert_eq!(AspectRatio::Wide.export_size(ExportQuality::Sd), (854, 480));
    assert_eq!(AspectRatio::Tall.export_size(ExportQuality::Hd), (720, 1280));
    assert_eq!(AspectRatio::Square.export_size(ExportQuality::FullHd), (1080, 1080));
}

#[test]
fn bitrate_thresholds_are_strict() {
    // 1920x1080 at 1 fps is exactly the top threshold.
    assert_eq!(video_bitrate_bps(1920, 1080, 1), 5_000_000);
    assert_eq!(video_bitrate_bps(1920, 1080, 30), 8_000_000);
    assert_eq!(video_bitrate_bps(1280, 720, 2), 5_000_000);
    // 720x720 is exactly the lowest threshold.
    assert_eq!(video_bitrate_bps(720, 720, 1), 1_000_000);
    assert_eq!(video_bitrate_bps(720, 720, 2), 2_500_000);
    assert_eq!(video_bitrate_bps(720, 720, 3), 5_000_000);
    assert_eq!(video_bitrate_bps(720, 720, 5), 8_000_000);
    assert_eq!(video_bitrate_bps(100, 100, 30), 1_000_000);
    assert_eq!(AUDIO_BITRATE_BPS, 320_000);
}

#[test]
fn deadline_and_frame_math_is_deterministic() {
    assert!((export_deadline_s(30.0, None) - 30.5).abs() < 1e-12);
    assert!((export_deadline_s(30.0, Some(12.25)) - 12.75).abs() < 1e-12);
    assert!((export_deadline_s(5.0, Some(10.0)) - 5.5).abs() < 1e-12);
    assert!((export_deadline_s(-1.0, None) - 0.5).abs() < 1e-12);

    assert_eq!(frame_count(2.0, 60), 120);
    assert_eq!(frame_count(2.999, 30), 89);
    assert_eq!(frame_count(0.01, 60), 1);
    assert_eq!(frame_time(45, 30), 1.5);
}

#[test]
fn progress_is_clamped() {
    assert_eq!(progress(0.0, 10.0), 0.0);
    assert_eq!(progress(5.0, 10.0), 0.5);
    assert_eq!(progress(12.0, 10.0), 1.0);
    assert_eq!(progress(1.0, 0.0), 1.0);
}

#[test]
fn plan_combines_the_pieces() {
    let plan = ExportPlan::new(
        CANDIDATES[2],
        AspectRatio::Wide.export_size(ExportQuality::Hd),
        30,
        10.0,
        Some(4.0),
        PathBuf::from("in.wav"),
        PathBuf::from("out.mp4"),
        "ffmpeg",
    )
    .unwrap();
    assert_eq!(plan.deadline_s, 4.5);
    assert_eq!(plan.media_duration_s, 4.0);
    assert_eq!(plan.frame_count, 135);
    assert_eq!(plan.video_bitrate_bps, 8_000_000);
    assert_eq!(plan.frame_bytes(), 1280 * 720 * 4);
}

// ── Container negotiation ───────────────────────────────────────────────────

#[test]
fn auto_prefers_webm_vp9() {
    let all = caps(&["libvpx-vp9", "libvpx", "libopus", "libx264", "aac"]);
    let pick = negotiate(&all, FormatPreference::Auto).unwrap();
    assert_eq!(pick.container, Container::WebM);
    assert_eq!(pick.video_encoder, "libvpx-vp9");
}

#[test]
fn falls_back_through_candidates() {
    let vp8_only = caps(&["libvpx", "libopus", "aac"]);
    assert_eq!(
        negotiate(&vp8_only, FormatPreference::Auto).unwrap().video_encoder,
        "libvpx"
    );

    let h264_only = caps(&["libx264", "aac"]);
    let pick = negotiate(&h264_only, FormatPreference::Webm).unwrap();
    assert_eq!(pick.container, Container::Mp4);
}

#[test]
fn explicit_mp4_goes_first() {
    let order = candidate_order(FormatPreference::Mp4);
    assert_eq!(order[0].container, Container::Mp4);
    assert_eq!(order.len(), CANDIDATES.len());
    assert_eq!(candidate_order(FormatPreference::Auto), CANDIDATES.to_vec());
}

#[test]
fn no_encoder_pair_is_capture_unsupported() {
    let err = negotiate(&caps(&["libopus", "libx264"]), FormatPreference::Auto).unwrap_err();
    assert!(matches!(err, StudioError::CaptureUnsupported(_)));
}

// ── Session lifecycle ───────────────────────────────────────────────────────

#[test]
fn stop_is_idempotent_when_idle() {
    let mut session = ExportSession::new();
    assert!(!session.is_recording());
    session.stop();
    session.stop();
    assert!(!session.is_recording());
    assert!(session.finish().is_err());
    assert!(session.push_frame(&[0; 4]).is_err());
}

#[test]
fn missing_encoder_program_is_capture_unsupported() {
    let mut plan = small_plan(1.0, 10);
    plan.ffmpeg = "wavestudio-no-such-encoder".to_string();
    let mut session = ExportSession::new();
    let err = session.start(&plan).unwrap_err();
    assert!(matches!(err, StudioError::CaptureUnsupported(_)));
    assert!(!session.is_recording());
}

// ── Frame loop ──────────────────────────────────────────────────────────────

#[test]
fn offline_feed_renders_every_frame() {
    let samples: Vec<f32> = (0..8_000).map(|i| if i < 4_000 { 0.0 } else { 0.9 }).collect();
    let signal = Arc::new(DecodedAudio::new(samples, 8_000).unwrap());
    let plan = small_plan(signal.duration_s(), 10);
    let settings = VisualSettings {
        style: VisualStyle::Breathing,
        dot_size: 2.0,
        dot_spacing: 2.0,
        amplitude: 100.0,
        ..VisualSettings::default()
    };

    let mut feed = EnvelopeFeed::new(EnvelopeSource::Offline, &signal, plan.fps);
    let mut sink = FrameLog::default();
    let n = render_frames(&plan, &settings, &signal, &mut feed, &mut sink).unwrap();

    // 1.5 s deadline at 10 fps.
    assert_eq!(n, 15);
    assert_eq!(sink.frames.len(), 15);
    assert!(sink.frames.iter().all(|f| f.len() == plan.frame_bytes()));
    // Silent first half, loud second half; frames past the track reuse the last value.
    assert_ne!(sink.frames[0], sink.frames[9]);
    assert_eq!(sink.frames[9], sink.frames[14]);
}

#[test]
fn offline_feed_reads_normalized_track() {
    let samples: Vec<f32> = (0..800).map(|i| if i < 400 { 0.25 } else { 0.5 }).collect();
    let signal = Arc::new(DecodedAudio::new(samples, 800).unwrap());
    let mut feed = EnvelopeFeed::new(EnvelopeSource::Offline, &signal, 2);
    assert_eq!(feed.snapshot_at(0, 0.0).unwrap().rms, 0.5);
    assert_eq!(feed.snapshot_at(1, 0.5).unwrap().rms, 1.0);
    assert_eq!(feed.snapshot_at(99, 49.5).unwrap().rms, 1.0);
    assert_eq!(feed.snapshot_at(1, 0.5).unwrap().bands.treble, 0.0);
}

#[test]
fn live_feed_follows_frame_clock() {
    let mut samples = vec![0.0f32; 8_000];
    samples.extend((0..8_000).map(|i| (i as f32 * 0.3).sin() * 0.8));
    let signal = Arc::new(DecodedAudio::new(samples, 8_000).unwrap());
    let mut feed = EnvelopeFeed::new(EnvelopeSource::Live, &signal, 10);

    let quiet = feed.snapshot_at(5, frame_time(5, 10)).unwrap();
    assert_eq!(quiet.rms, 0.0);
    let loud = feed.snapshot_at(15, frame_time(15, 10)).unwrap();
    assert!(loud.rms > 0.0);
}

#[test]
fn empty_track_offline_feed_has_no_snapshot() {
    let signal = Arc::new(DecodedAudio::new(Vec::new(), 8_000).unwrap());
    let mut feed = EnvelopeFeed::new(EnvelopeSource::Offline, &signal, 30);
    assert!(feed.snapshot_at(0, 0.0).is_none());
}
