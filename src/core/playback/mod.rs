//! Sample playback: instruments, sample stores, the background loader,
//! the software mixer and the engine that turns note edges into voices.

mod engine;
mod envelope;
mod instrument;
mod loader;
mod mixer;
mod output;
mod samples;
mod tone;

pub use engine::{
    PlaybackEngine, DEFAULT_RELEASE_FADE_SECS, DEFAULT_VOLUME, RETRIGGER_FADE_SECS,
    VOICE_FADE_IN_SECS,
};
pub use envelope::GainRamp;
pub use instrument::{EnvelopeKind, Instrument, InstrumentCatalog, DEFAULT_INSTRUMENT};
pub use loader::{LoadRequest, LoadedSample, SampleLoader};
pub use mixer::{Mixer, MixerCommand, MixerHandle, VoiceId, MASTER_RAMP_SECS, MAX_VOICES};
pub use output::{CpalOutput, HEADLESS_SAMPLE_RATE};
pub use samples::{InstrumentStore, SampleBuffer, WavDirectoryStore};
pub use tone::{ToneStore, Waveform};

/// Where voices are scheduled. Every call is fire-and-forget; fades run
/// on the audio clock, not the frame clock.
pub trait AudioOutput {
    fn start_voice(&mut self, buffer: &SampleBuffer, looping: bool, fade_in: f32) -> VoiceId;

    /// Cancel any pending gain automation on the voice and fade it out.
    fn stop_voice(&mut self, id: VoiceId, fade: f32);

    fn set_master_gain(&mut self, gain: f32, ramp: f32);

    fn stop_all(&mut self, fade: f32);

    /// Voices that ended or finished fading since the last call.
    fn drain_finished(&mut self) -> Vec<VoiceId>;
}
