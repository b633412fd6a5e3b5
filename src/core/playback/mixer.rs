//! Software voice mixer driven by the audio clock.
//!
//! The [`Mixer`] lives inside the audio callback. The frame loop talks to
//! it through a [`MixerHandle`], which sends [`MixerCommand`]s over a
//! channel and collects the ids of voices that have gone quiet.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::trace;

use super::envelope::GainRamp;
use super::samples::SampleBuffer;
use super::AudioOutput;

pub type VoiceId = u64;

/// Master volume changes ramp over this long.
pub const MASTER_RAMP_SECS: f32 = 0.02;

/// Voices mixed at once. Starting one more steals the oldest.
pub const MAX_VOICES: usize = 64;
const FINISHED_CAPACITY: usize = MAX_VOICES * 4;

#[derive(Debug, Clone)]
pub enum MixerCommand {
    Start {
        id: VoiceId,
        buffer: SampleBuffer,
        looping: bool,
        fade_in: f32,
    },
    Stop {
        id: VoiceId,
        fade: f32,
    },
    StopAll {
        fade: f32,
    },
    MasterGain {
        gain: f32,
        ramp: f32,
    },
}

#[derive(Debug)]
struct Voice {
    id: VoiceId,
    buffer: SampleBuffer,
    position: f64,
    step: f64,
    looping: bool,
    gain: GainRamp,
    stopping: bool,
}

impl Voice {
    /// Next resampled value, or `None` once a one-shot runs past its end.
    fn next_sample(&mut self) -> Option<f32> {
        let samples = self.buffer.samples();
        let len = samples.len();
        if len == 0 {
            return None;
        }
        if self.position >= len as f64 {
            if !self.looping {
                return None;
            }
            self.position %= len as f64;
        }

        let index = self.position.floor() as usize;
        let fraction = (self.position - index as f64) as f32;
        let current = samples[index];
        let next = match samples.get(index + 1) {
            Some(s) => *s,
            None if self.looping => samples[0],
            None => 0.0,
        };
        self.position += self.step;

        let value = current * (1.0 - fraction) + next * fraction;
        Some(value * self.gain.next_value())
    }

    fn is_finished(&self) -> bool {
        self.stopping && self.gain.is_silent()
    }
}

pub struct Mixer {
    sample_rate: u32,
    voices: Vec<Voice>,
    master: GainRamp,
    commands: Receiver<MixerCommand>,
    finished: Sender<VoiceId>,
}

impl Mixer {
    /// Create a mixer rendering at `sample_rate` and the handle that
    /// controls it.
    pub fn new(sample_rate: u32) -> (Mixer, MixerHandle) {
        let (command_tx, command_rx) = unbounded();
        let (finished_tx, finished_rx) = bounded(FINISHED_CAPACITY);
        let mixer = Mixer {
            sample_rate,
            voices: Vec::with_capacity(MAX_VOICES),
            master: GainRamp::new(1.0),
            commands: command_rx,
            finished: finished_tx,
        };
        let handle = MixerHandle {
            sample_rate,
            next_id: 1,
            commands: command_tx,
            finished: finished_rx,
        };
        (mixer, handle)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Apply every pending command. Called once per audio callback.
    pub fn process_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: MixerCommand) {
        match command {
            MixerCommand::Start {
                id,
                buffer,
                looping,
                fade_in,
            } => {
                let mut gain = GainRamp::new(0.0);
                gain.ramp_to(1.0, fade_in, self.sample_rate);
                let step = buffer.sample_rate() as f64 / self.sample_rate as f64;
                if self.voices.len() >= MAX_VOICES {
                    let stolen = self.voices.remove(0);
                    let _ = self.finished.try_send(stolen.id);
                }
                self.voices.push(Voice {
                    id,
                    buffer,
                    position: 0.0,
                    step,
                    looping,
                    gain,
                    stopping: false,
                });
            }
            MixerCommand::Stop { id, fade } => {
                let rate = self.sample_rate;
                if let Some(voice) = self.voices.iter_mut().find(|v| v.id == id) {
                    voice.gain.ramp_to(0.0, fade, rate);
                    voice.stopping = true;
                }
            }
            MixerCommand::StopAll { fade } => {
                for voice in self.voices.iter_mut() {
                    voice.gain.ramp_to(0.0, fade, self.sample_rate);
                    voice.stopping = true;
                }
            }
            MixerCommand::MasterGain { gain, ramp } => {
                self.master.ramp_to(gain.clamp(0.0, 1.0), ramp, self.sample_rate);
            }
        }
    }

    /// Mix one output sample and retire voices that have ended.
    pub fn next_sample(&mut self) -> f32 {
        let mut mix = 0.0;
        let mut ended = false;
        for voice in self.voices.iter_mut() {
            match voice.next_sample() {
                Some(value) => mix += value,
                None => {
                    voice.stopping = true;
                    voice.gain = GainRamp::new(0.0);
                }
            }
            ended |= voice.is_finished();
        }
        if ended {
            let finished = &self.finished;
            self.voices.retain(|voice| {
                if voice.is_finished() {
                    let _ = finished.try_send(voice.id);
                    false
                } else {
                    true
                }
            });
        }
        mix * self.master.next_value()
    }

    /// Process pending commands and fill `out` with the mono mix.
    pub fn render(&mut self, out: &mut [f32]) {
        self.process_commands();
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

/// Control side of a [`Mixer`]. Without a running stream the commands
/// are accepted and simply never rendered.
#[derive(Debug)]
pub struct MixerHandle {
    sample_rate: u32,
    next_id: VoiceId,
    commands: Sender<MixerCommand>,
    finished: Receiver<VoiceId>,
}

impl MixerHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn send(&self, command: MixerCommand) {
        if self.commands.send(command).is_err() {
            trace!("mixer is gone, dropping command");
        }
    }
}

impl AudioOutput for MixerHandle {
    fn start_voice(&mut self, buffer: &SampleBuffer, looping: bool, fade_in: f32) -> VoiceId {
        let id = self.next_id;
        self.next_id += 1;
        self.send(MixerCommand::Start {
            id,
            buffer: buffer.clone(),
            looping,
            fade_in,
        });
        id
    }

    fn stop_voice(&mut self, id: VoiceId, fade: f32) {
        self.send(MixerCommand::Stop { id, fade });
    }

    fn set_master_gain(&mut self, gain: f32, ramp: f32) {
        self.send(MixerCommand::MasterGain { gain, ramp });
    }

    fn stop_all(&mut self, fade: f32) {
        self.send(MixerCommand::StopAll { fade });
    }

    fn drain_finished(&mut self) -> Vec<VoiceId> {
        let finished: Vec<VoiceId> = self.finished.try_iter().collect();
        if !finished.is_empty() {
            trace!("voices finished: {:?}", finished);
        }
        finished
    }
}
