//! Offline per-frame loudness track for export-time consumers.
//!
//! This is a time-domain estimate computed straight from the decoded samples.
//! It is independent of the live analyzer (which works on spectrum bytes), and
//! the two are expected to disagree slightly.

use crate::audio::DecodedAudio;

/// Per-frame RMS over the whole track, normalized so the loudest frame is 1.0.
///
/// The track is split into `floor(duration * fps)` frames of
/// `floor(sample_rate / fps)` samples (at least one). An all-silent track
/// yields all zeros; an empty track (or `fps == 0`) yields an empty sequence.
pub fn sample_for_visualization(audio: &DecodedAudio, fps: u32) -> Vec<f32> {
    let samples = audio.samples();
    if samples.is_empty() || fps == 0 {
        return Vec::new();
    }

    let total_frames = (audio.duration_s() * fps as f64).floor() as usize;
    let samples_per_frame = ((audio.sample_rate() / fps) as usize).max(1);

    let mut frames = Vec::with_capacity(total_frames);
    for frame in 0..total_frames {
        let start = (frame * samples_per_frame).min(samples.len());
        let end = (start + samples_per_frame).min(samples.len());
        frames.push(slice_rms(&samples[start..end]));
    }

    let peak = frames.iter().copied().fold(0.0f32, f32::max);
    if peak > 0.0 {
        for v in &mut frames {
            *v /= peak;
        }
    }
    frames
}

fn slice_rms(slice: &[f32]) -> f32 {
    if slice.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = slice.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_sq / slice.len() as f64).sqrt() as f32
}
