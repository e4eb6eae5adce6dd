use crate::audio::DecodedAudio;
use crate::error::StudioError;
use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared read position into a [`DecodedAudio`], in (fractional) source frames.
///
/// During live playback the output callback is the only writer; the export loop
/// sets it explicitly per frame instead. Readers never observe a torn value.
pub struct Playhead {
    frames_bits: AtomicU64,
    sample_rate_hz: u32,
}

impl Playhead {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            frames_bits: AtomicU64::new(0f64.to_bits()),
            sample_rate_hz: sample_rate_hz.max(1),
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn position_frames(&self) -> f64 {
        f64::from_bits(self.frames_bits.load(Ordering::Acquire))
    }

    pub fn current_time(&self) -> f64 {
        self.position_frames() / self.sample_rate_hz as f64
    }

    pub fn seek(&self, time_s: f64) {
        let frames = (time_s.max(0.0)) * self.sample_rate_hz as f64;
        self.frames_bits.store(frames.to_bits(), Ordering::Release);
    }

    /// Publish `new` only if nobody seeked since `old` was read.
    fn advance_from(&self, old: f64, new: f64) {
        let _ = self.frames_bits.compare_exchange(
            old.to_bits(),
            new.to_bits(),
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
    }
}

pub fn list_output_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.output_devices().context("enumerate output devices")?;

    let mut out = io::stdout();
    writeln!(out, "Output devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

/// Plays a decoded track on an output device and drives its [`Playhead`].
///
/// Dropping the value pauses and releases the device stream.
pub struct Playback {
    stream: cpal::Stream,
    playhead: Arc<Playhead>,
    paused: Arc<AtomicBool>,
    duration_s: f64,
    pub output_rate_hz: u32,
}

impl Playback {
    pub fn new(signal: Arc<DecodedAudio>, device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_output_device(&host, device_query)?;
        let supported = pick_output_config(&device, signal.sample_rate())?;
        let output_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let playhead = Arc::new(Playhead::new(signal.sample_rate()));
        // Start paused so no audio is emitted before play() is called.
        let paused = Arc::new(AtomicBool::new(true));
        let ratio = signal.sample_rate() as f64 / output_rate_hz.max(1) as f64;

        let feed = OutputFeed {
            signal: Arc::clone(&signal),
            playhead: Arc::clone(&playhead),
            paused: Arc::clone(&paused),
            ratio,
            channels: channels.max(1),
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, feed)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, feed)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, feed)?,
            fmt => {
                return Err(anyhow!(StudioError::CaptureUnsupported(format!(
                    "unsupported output sample format: {fmt:?}"
                ))));
            }
        };

        if output_rate_hz != signal.sample_rate() {
            warn!(
                source_hz = signal.sample_rate(),
                output_hz = output_rate_hz,
                "output device does not support the track rate; resampling"
            );
        }

        Ok(Self {
            stream,
            playhead,
            paused,
            duration_s: signal.duration_s(),
            output_rate_hz,
        })
    }

    pub fn playhead(&self) -> Arc<Playhead> {
        Arc::clone(&self.playhead)
    }

    /// Start from the beginning of the track.
    pub fn play(&self) -> anyhow::Result<()> {
        self.playhead.seek(0.0);
        self.paused.store(false, Ordering::Release);
        self.stream.play().context("start output stream")?;
        info!(duration_s = self.duration_s, "playback started");
        Ok(())
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn stop(&self) {
        self.pause();
        self.playhead.seek(0.0);
        info!("playback stopped");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn current_time(&self) -> f64 {
        self.playhead.current_time()
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    pub fn is_finished(&self) -> bool {
        self.current_time() >= self.duration_s
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.paused.store(true, Ordering::Release);
        let _ = self.stream.pause();
    }
}

struct OutputFeed {
    signal: Arc<DecodedAudio>,
    playhead: Arc<Playhead>,
    paused: Arc<AtomicBool>,
    ratio: f64,
    channels: usize,
}

impl OutputFeed {
    fn fill<T: SizedSample + FromSample<f32>>(&self, data: &mut [T]) {
        if self.paused.load(Ordering::Acquire) {
            data.fill(T::EQUILIBRIUM);
            return;
        }

        let samples = self.signal.samples();
        let end = samples.len() as f64;
        let start = self.playhead.position_frames();
        let mut pos = start;

        for frame in data.chunks_mut(self.channels) {
            let v = if pos < end { lerp_sample(samples, pos) } else { 0.0 };
            let out = T::from_sample(v);
            for s in frame.iter_mut() {
                *s = out;
            }
            pos = (pos + self.ratio).min(end);
        }

        self.playhead.advance_from(start, pos);
    }
}

fn lerp_sample(samples: &[f32], pos: f64) -> f32 {
    let i = pos.floor() as usize;
    let frac = (pos - pos.floor()) as f32;
    let a = samples.get(i).copied().unwrap_or(0.0);
    let b = samples.get(i + 1).copied().unwrap_or(a);
    a + (b - a) * frac
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    feed: OutputFeed,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let err_fn = |err| error!("audio output stream error: {err}");
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| feed.fill(data),
            err_fn,
            None,
        )
        .context("build output stream")
}

fn pick_output_config(
    device: &cpal::Device,
    track_rate_hz: u32,
) -> anyhow::Result<cpal::SupportedStreamConfig> {
    let wanted = cpal::SampleRate(track_rate_hz);
    if let Ok(ranges) = device.supported_output_configs() {
        let mut matching = ranges
            .filter(|r| r.min_sample_rate() <= wanted && wanted <= r.max_sample_rate())
            .collect::<Vec<_>>();
        // Prefer float output when the device offers it at the track rate.
        matching.sort_by_key(|r| r.sample_format() != SampleFormat::F32);
        if let Some(range) = matching.into_iter().next() {
            return Ok(range.with_sample_rate(wanted));
        }
    }

    device
        .default_output_config()
        .context("get default output config")
}

fn select_output_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    if let Some(want) = device_query.map(|s| s.to_lowercase()) {
        let devices = host
            .output_devices()
            .context("enumerate output devices")?
            .collect::<Vec<_>>();
        return devices
            .into_iter()
            .find(|d| {
                d.name()
                    .map(|n| n.to_lowercase().contains(&want))
                    .unwrap_or(false)
            })
            .ok_or_else(|| anyhow!("no output device matching: {want}"));
    }

    host.default_output_device().ok_or_else(|| {
        anyhow!(StudioError::CaptureUnsupported(
            "no default output device found".to_string()
        ))
    })
}
