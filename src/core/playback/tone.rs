use std::f32::consts::PI;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::instrument::{EnvelopeKind, Instrument};
use super::samples::{InstrumentStore, SampleBuffer};
use crate::core::keyboard::{midi_note_to_freq, parse_note};
use crate::utils::helpers::{normalize_samples, seconds_to_samples};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Saw,
    Triangle,
}

impl Waveform {
    /// One period sampled at `phase` in [0, 1).
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    -4.0 + 4.0 * phase
                }
            }
        }
    }
}

/// Renders note buffers from the instrument's waveform so the piano can
/// play without any sample files on disk.
#[derive(Debug, Clone)]
pub struct ToneStore {
    sample_rate: u32,
    /// Length of one-shot tones.
    pub decay_secs: f32,
    /// Approximate length of sustain loops, rounded to whole cycles.
    pub loop_secs: f32,
}

impl ToneStore {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            decay_secs: 1.5,
            loop_secs: 0.5,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn render(&self, waveform: Waveform, envelope: EnvelopeKind, frequency: f32) -> SampleBuffer {
        let rate = self.sample_rate as f32;
        let mut samples: Vec<f32> = match envelope {
            EnvelopeKind::Attack => {
                let len = seconds_to_samples(self.decay_secs, self.sample_rate) as usize;
                let onset = seconds_to_samples(0.005, self.sample_rate).max(1) as f32;
                (0..len)
                    .map(|i| {
                        let t = i as f32 / rate;
                        let phase = (frequency * t).fract();
                        let swell = (i as f32 / onset).min(1.0);
                        waveform.sample(phase) * swell * (-3.0 * t).exp()
                    })
                    .collect()
            }
            EnvelopeKind::Sustain => {
                let cycles = (frequency * self.loop_secs).round().max(1.0);
                let len = (cycles * rate / frequency).round().max(1.0) as usize;
                (0..len)
                    .map(|i| {
                        let phase = (i as f32 / len as f32 * cycles).fract();
                        waveform.sample(phase)
                    })
                    .collect()
            }
        };
        normalize_samples(&mut samples);
        for s in samples.iter_mut() {
            *s *= 0.8;
        }
        SampleBuffer::new(samples, self.sample_rate)
    }
}

impl InstrumentStore for ToneStore {
    fn fetch_sample_buffer(&self, instrument: &Instrument, note: &str) -> Result<SampleBuffer> {
        let frequency = midi_note_to_freq(parse_note(note)?);
        Ok(self.render(instrument.waveform, instrument.envelope, frequency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::playback::instrument::InstrumentCatalog;

    #[test]
    fn waveforms_span_unit_range() {
        assert_eq!(Waveform::Square.sample(0.1), 1.0);
        assert_eq!(Waveform::Saw.sample(0.0), -1.0);
        assert_eq!(Waveform::Triangle.sample(0.25), 1.0);
        assert!(Waveform::Sine.sample(0.0).abs() < 1e-6);
    }

    #[test]
    fn attack_tone_decays() {
        let store = ToneStore::new(8_000);
        let buffer = store.render(Waveform::Sine, EnvelopeKind::Attack, 440.0);
        assert_eq!(buffer.len(), 12_000);
        let peak = |range: std::ops::Range<usize>| {
            buffer.samples()[range].iter().fold(0.0f32, |m, s| m.max(s.abs()))
        };
        assert!(peak(0..800) > peak(11_000..12_000) * 4.0);
    }

    #[test]
    fn sustain_tone_holds_whole_cycles() {
        let store = ToneStore::new(8_000);
        let buffer = store.render(Waveform::Sine, EnvelopeKind::Sustain, 400.0);
        // 200 cycles of 20 samples
        assert_eq!(buffer.len(), 4_000);
        assert!(buffer.samples()[0].abs() < 1e-6);
        assert!((buffer.samples()[5] - 0.8).abs() < 1e-3);
    }

    #[test]
    fn store_renders_at_note_pitch() {
        let catalog = InstrumentCatalog::builtin(["A4"]);
        let store = ToneStore::new(8_000);
        let buffer = store
            .fetch_sample_buffer(catalog.get("mellotron").unwrap(), "A4")
            .unwrap();
        assert_eq!(buffer.sample_rate(), 8_000);
        assert!(store
            .fetch_sample_buffer(catalog.get("piano").unwrap(), "nonsense")
            .is_err());
    }
}
