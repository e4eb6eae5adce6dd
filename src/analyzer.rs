use crate::spectrum::{SpectrumSource, BIN_COUNT};

const BASS_MAX_HZ: f32 = 250.0;
const LOW_MID_MAX_HZ: f32 = 500.0;
const MID_MAX_HZ: f32 = 2000.0;
const HIGH_MID_MAX_HZ: f32 = 4000.0;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FrequencyBands {
    pub bass: f32,
    pub low_mid: f32,
    pub mid: f32,
    pub high_mid: f32,
    pub treble: f32,
}

impl FrequencyBands {
    pub fn as_array(&self) -> [f32; 5] {
        [self.bass, self.low_mid, self.mid, self.high_mid, self.treble]
    }
}

/// Loudness features for one rendered frame. All values are in `[0, 1]`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LiveAnalysisSnapshot {
    pub rms: f32,
    pub bands: FrequencyBands,
}

/// Per-tick view over a [`SpectrumSource`].
///
/// Holds no audio itself; until a source is attached every snapshot is `None`.
pub struct LiveAnalyzer {
    source: Option<Box<dyn SpectrumSource>>,
    magnitudes: Vec<u8>,
}

impl Default for LiveAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveAnalyzer {
    pub fn new() -> Self {
        Self {
            source: None,
            magnitudes: vec![0; BIN_COUNT],
        }
    }

    pub fn with_source(source: Box<dyn SpectrumSource>) -> Self {
        let mut analyzer = Self::new();
        analyzer.attach(source);
        analyzer
    }

    /// Replace the current source. Stale magnitudes from the previous one are cleared.
    pub fn attach(&mut self, source: Box<dyn SpectrumSource>) {
        self.magnitudes.fill(0);
        self.source = Some(source);
    }

    pub fn detach(&mut self) -> Option<Box<dyn SpectrumSource>> {
        self.magnitudes.fill(0);
        self.source.take()
    }

    pub fn is_initialized(&self) -> bool {
        self.source.is_some()
    }

    /// Refresh magnitudes from the source and derive this frame's features.
    pub fn snapshot(&mut self) -> Option<LiveAnalysisSnapshot> {
        let source = self.source.as_mut()?;
        source.fill_byte_frequency_data(&mut self.magnitudes);
        let sample_rate = source.sample_rate();
        Some(LiveAnalysisSnapshot {
            rms: rms_from_magnitudes(&self.magnitudes),
            bands: bands_from_magnitudes(&self.magnitudes, sample_rate),
        })
    }

    /// Clear the source's smoothing history and the cached magnitudes.
    pub fn reset(&mut self) {
        self.magnitudes.fill(0);
        if let Some(source) = self.source.as_mut() {
            source.reset();
        }
    }

    /// Magnitudes as of the last [`snapshot`](Self::snapshot).
    pub fn magnitudes(&self) -> &[u8] {
        &self.magnitudes
    }
}

pub fn rms_from_magnitudes(magnitudes: &[u8]) -> f32 {
    if magnitudes.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = magnitudes.iter().map(|&m| (m as f64) * (m as f64)).sum();
    ((sum_sq / magnitudes.len() as f64).sqrt() / 255.0) as f32
}

/// Split bins into five ranges by centre frequency `i * (sr/2) / bin_count`
/// and average each range.
pub fn bands_from_magnitudes(magnitudes: &[u8], sample_rate: u32) -> FrequencyBands {
    let bin_count = magnitudes.len();
    if bin_count == 0 {
        return FrequencyBands::default();
    }
    let nyquist = sample_rate as f32 / 2.0;

    let mut sums = [0u32; 5];
    let mut counts = [0u32; 5];
    for (i, &m) in magnitudes.iter().enumerate() {
        let freq = i as f32 * nyquist / bin_count as f32;
        let band = if freq <= BASS_MAX_HZ {
            0
        } else if freq <= LOW_MID_MAX_HZ {
            1
        } else if freq <= MID_MAX_HZ {
            2
        } else if freq <= HIGH_MID_MAX_HZ {
            3
        } else {
            4
        };
        sums[band] += m as u32;
        counts[band] += 1;
    }

    let avg = |b: usize| {
        if counts[b] == 0 {
            0.0
        } else {
            sums[b] as f32 / counts[b] as f32 / 255.0
        }
    };
    FrequencyBands {
        bass: avg(0),
        low_mid: avg(1),
        mid: avg(2),
        high_mid: avg(3),
        treble: avg(4),
    }
}
