use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::debug;

use super::instrument::Instrument;
use crate::utils::helpers::{downmix_to_mono, format_time, normalize_samples};

/// Decoded mono audio, shared cheaply between the cache and the mixer.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Decode a WAV file into a mono buffer with its peak normalized.
    pub fn from_wav(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open sample: {}", path.display()))?;
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .with_context(|| format!("Failed to decode sample: {}", path.display()))?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<Result<_, _>>()
                    .with_context(|| format!("Failed to decode sample: {}", path.display()))?
            }
        };

        let mut samples = downmix_to_mono(&interleaved, spec.channels as usize);
        if samples.is_empty() {
            return Err(anyhow!("sample {} contains no audio", path.display()));
        }
        normalize_samples(&mut samples);
        let buffer = Self::new(samples, spec.sample_rate);
        debug!(
            "decoded {} ({}, {} Hz)",
            path.display(),
            format_time(buffer.duration_secs()),
            buffer.sample_rate()
        );
        Ok(buffer)
    }
}

/// Source of decoded note samples. Called off the frame loop, once per
/// note; results are cached by the playback engine.
pub trait InstrumentStore: Send + Sync {
    fn fetch_sample_buffer(&self, instrument: &Instrument, note: &str) -> Result<SampleBuffer>;
}

/// Reads `<root>/<instrument id>/<sample ref>.wav`.
#[derive(Debug, Clone)]
pub struct WavDirectoryStore {
    root: PathBuf,
}

impl WavDirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sample_path(&self, instrument: &Instrument, note: &str) -> Result<PathBuf> {
        let sample_ref = instrument
            .sample_ref(note)
            .ok_or_else(|| anyhow!("{} has no sample for {}", instrument.id, note))?;
        let mut path = self.root.join(&instrument.id).join(sample_ref);
        if path.extension().is_none() {
            path.set_extension("wav");
        }
        Ok(path)
    }
}

impl InstrumentStore for WavDirectoryStore {
    fn fetch_sample_buffer(&self, instrument: &Instrument, note: &str) -> Result<SampleBuffer> {
        let path = self.sample_path(instrument, note)?;
        SampleBuffer::from_wav(&path)
    }
}
