use crate::error::{Result, StudioError};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info};

/// Default number of points sampled by [`DecodedAudio::average_amplitude_over_range`].
pub const RANGE_SAMPLE_COUNT: usize = 100;

/// A decoded track, down-mixed to a single channel.
///
/// Built once per loaded file and never mutated afterwards; loading another file
/// replaces the whole value.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    mono_samples: Vec<f32>,
    sample_rate: u32,
    duration_s: f64,
}

impl DecodedAudio {
    pub fn new(mono_samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(StudioError::Decode("sample rate must be positive".to_string()));
        }
        let duration_s = mono_samples.len() as f64 / sample_rate as f64;
        Ok(Self {
            mono_samples,
            sample_rate,
            duration_s,
        })
    }

    /// Build from per-channel sample planes using the mono down-mix rule.
    pub fn from_planes(planes: &[Vec<f32>], sample_rate: u32) -> Result<Self> {
        Self::new(downmix(planes), sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.mono_samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    pub fn len(&self) -> usize {
        self.mono_samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mono_samples.is_empty()
    }

    /// Absolute sample value at `time_s`; `0.0` for any time outside the buffer.
    pub fn amplitude_at(&self, time_s: f64) -> f32 {
        let idx = (time_s * self.sample_rate as f64).floor();
        // NaN fails both comparisons and lands here too.
        if !(idx >= 0.0 && idx < self.mono_samples.len() as f64) {
            return 0.0;
        }
        self.mono_samples[idx as usize].abs()
    }

    /// Mean absolute amplitude over `[start_s, end_s)`, sampled at roughly
    /// `sample_count` evenly strided points.
    ///
    /// Returns `0.0` when the walk visits no in-range sample (empty or inverted
    /// interval, or an interval entirely outside the buffer). Stride positions
    /// before the start of the buffer are skipped rather than counted.
    pub fn average_amplitude_over_range(&self, start_s: f64, end_s: f64, sample_count: usize) -> f32 {
        let sr = self.sample_rate as f64;
        let start_idx = (start_s * sr).floor();
        let end_idx = (end_s * sr).floor();
        if !start_idx.is_finite() || !end_idx.is_finite() || end_idx <= start_idx {
            return 0.0;
        }

        let start_idx = start_idx as i64;
        let end_idx = end_idx as i64;
        let per_point = (end_idx - start_idx) / sample_count.max(1) as i64;
        let step = per_point.max(1);
        let len = self.mono_samples.len() as i64;

        let mut sum = 0.0f64;
        let mut count = 0usize;
        let mut i = start_idx;
        while i < end_idx && i < len {
            if i >= 0 {
                sum += self.mono_samples[i as usize].abs() as f64;
                count += 1;
            }
            i += step;
        }

        if count == 0 {
            0.0
        } else {
            (sum / count as f64) as f32
        }
    }
}

/// Reduce channel planes to mono: channel 0 verbatim for mono input, otherwise
/// the arithmetic mean of channels 0 and 1. Extra channels are ignored.
pub fn downmix(planes: &[Vec<f32>]) -> Vec<f32> {
    match planes {
        [] => Vec::new(),
        [mono] => mono.clone(),
        [left, right, ..] => left
            .iter()
            .zip(right.iter())
            .map(|(l, r)| (l + r) / 2.0)
            .collect(),
    }
}

/// Decode an in-memory audio file (any container/codec symphonia can probe).
pub fn decode(bytes: &[u8]) -> Result<DecodedAudio> {
    decode_source(Box::new(Cursor::new(bytes.to_vec())), Hint::new())
}

/// Decode an audio file from disk, using its extension as a probe hint.
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)
        .map_err(|err| StudioError::Io(format!("open {}: {err}", path.display())))?;
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let decoded = decode_source(Box::new(file), hint)?;
    info!(
        path = %path.display(),
        sample_rate = decoded.sample_rate(),
        duration_s = decoded.duration_s(),
        "decoded audio"
    );
    Ok(decoded)
}

fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|err| StudioError::Decode(format!("unrecognized audio container: {err}")))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .or_else(|| {
            format
                .tracks()
                .iter()
                .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        })
        .cloned()
        .ok_or_else(|| StudioError::Decode("no decodable audio track".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| StudioError::Decode(format!("unsupported codec: {err}")))?;

    let mut sample_rate = track.codec_params.sample_rate;
    let mut planes: Vec<Vec<f32>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(StudioError::Decode(format!("read packet: {err}"))),
        };

        if packet.track_id() != track.id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!("skipping corrupt packet: {msg}");
                continue;
            }
            Err(err) => return Err(StudioError::Decode(format!("decode packet: {err}"))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        sample_rate.get_or_insert(spec.rate);

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        // Only the first two channels take part in the down-mix.
        let keep = channels.min(2);
        if planes.len() < keep {
            planes.resize_with(keep, Vec::new);
        }
        for frame in buf.samples().chunks_exact(channels) {
            for (plane, s) in planes.iter_mut().zip(frame.iter()) {
                plane.push(*s);
            }
        }
    }

    let sample_rate = sample_rate
        .filter(|&sr| sr > 0)
        .ok_or_else(|| StudioError::Decode("could not determine sample rate".to_string()))?;

    DecodedAudio::from_planes(&planes, sample_rate)
}
