use crate::audio::DecodedAudio;
use crate::playback::Playhead;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

pub const FFT_SIZE: usize = 2048;
pub const BIN_COUNT: usize = FFT_SIZE / 2;
pub const SMOOTHING: f32 = 0.3;
pub const MIN_DB: f32 = -100.0;
pub const MAX_DB: f32 = -30.0;

/// Pull-based source of byte-scaled frequency magnitudes.
pub trait SpectrumSource {
    fn sample_rate(&self) -> u32;

    /// Overwrite `out` with the current magnitudes, one byte per bin (0..=255).
    /// Slots past the source's bin count are left as zero.
    fn fill_byte_frequency_data(&mut self, out: &mut [u8]);

    /// Drop any history carried between reads.
    fn reset(&mut self) {}
}

/// Analyser over an already-decoded signal, reading the window that ends at a
/// shared playhead.
///
/// Emulates a browser `AnalyserNode` at fftSize 2048: Blackman window, |X|/N
/// magnitudes, exponential smoothing between reads, then dB mapped onto bytes
/// over `[MIN_DB, MAX_DB]`.
pub struct AnalyserSpectrum {
    signal: Arc<DecodedAudio>,
    playhead: Arc<Playhead>,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    fft_buf: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl AnalyserSpectrum {
    pub fn new(signal: Arc<DecodedAudio>, playhead: Arc<Playhead>) -> Self {
        let n = FFT_SIZE;
        let window = blackman_window(n);
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        Self {
            signal,
            playhead,
            window,
            fft,
            fft_buf: vec![Complex { re: 0.0, im: 0.0 }; n],
            smoothed: vec![0.0; BIN_COUNT],
        }
    }

    pub fn playhead(&self) -> &Arc<Playhead> {
        &self.playhead
    }

    fn analyze(&mut self) {
        let n = FFT_SIZE;
        let samples = self.signal.samples();
        let end = (self.playhead.position_frames().max(0.0).floor() as usize).min(samples.len());

        // Window of n samples ending at the playhead, zero-padded before 0.
        for i in 0..n {
            let idx = end as i64 - n as i64 + i as i64;
            let s = if idx >= 0 { samples[idx as usize] } else { 0.0 };
            self.fft_buf[i].re = s * self.window[i];
            self.fft_buf[i].im = 0.0;
        }

        self.fft.process(&mut self.fft_buf);

        let scale = 1.0 / n as f32;
        for (s, c) in self.smoothed.iter_mut().zip(self.fft_buf.iter()) {
            let mag = (c.re * c.re + c.im * c.im).sqrt() * scale;
            let next = SMOOTHING * *s + (1.0 - SMOOTHING) * mag;
            *s = if next.is_finite() { next } else { 0.0 };
        }
    }
}

impl SpectrumSource for AnalyserSpectrum {
    fn sample_rate(&self) -> u32 {
        self.signal.sample_rate()
    }

    fn fill_byte_frequency_data(&mut self, out: &mut [u8]) {
        self.analyze();
        out.fill(0);
        for (o, &m) in out.iter_mut().zip(self.smoothed.iter()) {
            *o = magnitude_to_byte(m);
        }
    }

    /// Forget smoothing history (e.g. after a seek).
    fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }
}

/// Map a linear magnitude onto the analyser's byte scale.
pub fn magnitude_to_byte(mag: f32) -> u8 {
    if !(mag > 0.0) {
        return 0;
    }
    let db = 20.0 * mag.log10();
    let scaled = (255.0 * (db - MIN_DB) / (MAX_DB - MIN_DB)).floor();
    scaled.clamp(0.0, 255.0) as u8
}

fn blackman_window(n: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_scale_endpoints() {
        assert_eq!(magnitude_to_byte(0.0), 0);
        assert_eq!(magnitude_to_byte(f32::NAN), 0);
        // -100 dB sits on the floor, -30 dB and louder saturate.
        assert_eq!(magnitude_to_byte(1e-5), 0);
        assert_eq!(magnitude_to_byte(1.0), 255);
        // -65 dB is halfway up the range.
        assert_eq!(magnitude_to_byte(10f32.powf(-65.0 / 20.0)), 127);
    }

    #[test]
    fn blackman_window_is_zero_at_edge_and_one_in_middle() {
        let w = blackman_window(FFT_SIZE);
        assert!(w[0].abs() < 1e-6);
        assert!((w[FFT_SIZE / 2] - 1.0).abs() < 1e-5);
    }
}
