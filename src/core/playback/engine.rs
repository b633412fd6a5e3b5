use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, trace};

use super::instrument::{EnvelopeKind, Instrument, InstrumentCatalog};
use super::loader::{LoadRequest, LoadedSample, SampleLoader};
use super::mixer::{VoiceId, MASTER_RAMP_SECS};
use super::samples::SampleBuffer;
use super::AudioOutput;
use crate::core::note::NoteEvents;
use crate::utils::helpers::format_time;

/// Fade applied to a sounding voice before it is retriggered.
pub const RETRIGGER_FADE_SECS: f32 = 0.015;
/// Fade-in on every new voice.
pub const VOICE_FADE_IN_SECS: f32 = 0.01;
/// Default fade-out when a sustained note is released.
pub const DEFAULT_RELEASE_FADE_SECS: f32 = 0.3;
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Turns note edges into voices on an [`AudioOutput`].
///
/// Attack instruments sound once per attack edge and decay on their own.
/// Sustain instruments loop from the first held frame that has a sample
/// until the release edge fades them out. Notes whose samples have not
/// arrived yet are silently skipped.
pub struct PlaybackEngine<O: AudioOutput> {
    output: O,
    catalog: InstrumentCatalog,
    instrument: Arc<Instrument>,
    notes: Vec<String>,
    loader: Option<SampleLoader>,
    cache: HashMap<String, SampleBuffer>,
    active: HashMap<String, VoiceId>,
    generation: u64,
    volume: f32,
    muted: bool,
    release_fade: f32,
}

impl<O: AudioOutput> PlaybackEngine<O> {
    /// `notes` are the keyboard's note ids; every instrument switch asks
    /// the loader for all of them.
    pub fn new(
        output: O,
        catalog: InstrumentCatalog,
        notes: Vec<String>,
        loader: Option<SampleLoader>,
    ) -> Self {
        let instrument = catalog
            .resolve(&catalog.default)
            .cloned()
            .map(Arc::new)
            .unwrap_or_else(|| {
                Arc::new(Instrument::new(
                    "silent",
                    "Silent",
                    EnvelopeKind::Attack,
                    Default::default(),
                ))
            });
        let mut engine = Self {
            output,
            catalog,
            instrument,
            notes,
            loader,
            cache: HashMap::new(),
            active: HashMap::new(),
            generation: 0,
            volume: DEFAULT_VOLUME,
            muted: false,
            release_fade: DEFAULT_RELEASE_FADE_SECS,
        };
        engine.push_gain();
        engine
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn catalog(&self) -> &InstrumentCatalog {
        &self.catalog
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn active_voice(&self, note: &str) -> Option<VoiceId> {
        self.active.get(note).copied()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_loaded(&self, note: &str) -> bool {
        self.cache.contains_key(note)
    }

    pub fn loaded_count(&self) -> usize {
        self.cache.len()
    }

    /// Switch instruments: silence every voice, drop cached samples and
    /// request the new set. The loader stops fetching for the previous
    /// instrument, and anything of it already in flight is ignored.
    pub fn load_instrument(&mut self, id: &str) {
        let Some(instrument) = self.catalog.resolve(id).cloned() else {
            return;
        };
        self.output.stop_all(RETRIGGER_FADE_SECS);
        self.active.clear();
        self.cache.clear();
        self.generation += 1;
        info!(
            "instrument '{}' ({:?}), generation {}",
            instrument.id, instrument.envelope, self.generation
        );
        self.instrument = Arc::new(instrument);

        if let Some(loader) = &self.loader {
            loader.request(LoadRequest {
                generation: self.generation,
                instrument: Arc::clone(&self.instrument),
                notes: self.notes.clone(),
            });
        }
    }

    /// Store a decoded sample if it belongs to the current instrument.
    pub fn accept(&mut self, loaded: LoadedSample) -> bool {
        if loaded.generation != self.generation {
            trace!(
                "dropping stale sample {} (generation {} != {})",
                loaded.note,
                loaded.generation,
                self.generation
            );
            return false;
        }
        self.cache.insert(loaded.note, loaded.buffer);
        true
    }

    pub fn on_attack(&mut self, note: &str) {
        let Some(buffer) = self.cache.get(note) else {
            trace!("no sample for {} yet", note);
            return;
        };
        match self.instrument.envelope {
            EnvelopeKind::Attack => {
                if let Some(previous) = self.active.remove(note) {
                    self.output.stop_voice(previous, RETRIGGER_FADE_SECS);
                }
                let id = self.output.start_voice(buffer, false, VOICE_FADE_IN_SECS);
                self.active.insert(note.to_string(), id);
            }
            EnvelopeKind::Sustain => {
                if self.active.contains_key(note) {
                    return;
                }
                let id = self.output.start_voice(buffer, true, VOICE_FADE_IN_SECS);
                self.active.insert(note.to_string(), id);
            }
        }
    }

    /// Called every frame a note stays held. Starts a sustain voice that
    /// could not start on the attack edge because its sample was late.
    pub fn on_sustained_hold(&mut self, note: &str) {
        if self.instrument.envelope == EnvelopeKind::Sustain && !self.active.contains_key(note) {
            self.on_attack(note);
        }
    }

    pub fn on_release(&mut self, note: &str) {
        if self.instrument.envelope == EnvelopeKind::Attack {
            return;
        }
        if let Some(id) = self.active.remove(note) {
            self.output.stop_voice(id, self.release_fade);
        }
    }

    /// Dispatch one frame's edges.
    pub fn apply(&mut self, events: &NoteEvents) {
        for note in &events.attacks {
            debug!("attack {}", note);
            self.on_attack(note);
        }
        for note in &events.sustained {
            self.on_sustained_hold(note);
        }
        for note in &events.releases {
            debug!("release {}", note);
            self.on_release(note);
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.push_gain();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.push_gain();
    }

    pub fn set_release_fade(&mut self, seconds: f32) {
        self.release_fade = seconds.max(0.0);
        debug!("release fade {}", format_time(self.release_fade));
    }

    fn push_gain(&mut self) {
        let gain = if self.muted { 0.0 } else { self.volume };
        self.output.set_master_gain(gain, MASTER_RAMP_SECS);
    }

    /// Take in finished loads and forget voices the output has retired.
    pub fn poll(&mut self) {
        let loaded = match &self.loader {
            Some(loader) => loader.try_results(),
            None => Vec::new(),
        };
        for sample in loaded {
            self.accept(sample);
        }

        let finished = self.output.drain_finished();
        if !finished.is_empty() {
            // a retriggered note already points at its newer voice
            self.active.retain(|_, id| !finished.contains(id));
        }
    }

    /// Stop everything, e.g. on shutdown.
    pub fn stop_all(&mut self) {
        self.output.stop_all(RETRIGGER_FADE_SECS);
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Records every call and tracks which voices are still sounding.
    #[derive(Default)]
    struct MockOutput {
        next_id: VoiceId,
        playing: HashSet<VoiceId>,
        started: Vec<(VoiceId, bool, f32)>,
        stopped: Vec<(VoiceId, f32)>,
        gains: Vec<f32>,
        stop_all_calls: usize,
        finished: Vec<VoiceId>,
    }

    impl AudioOutput for MockOutput {
        fn start_voice(&mut self, _buffer: &SampleBuffer, looping: bool, fade_in: f32) -> VoiceId {
            self.next_id += 1;
            self.playing.insert(self.next_id);
            self.started.push((self.next_id, looping, fade_in));
            self.next_id
        }

        fn stop_voice(&mut self, id: VoiceId, fade: f32) {
            self.playing.remove(&id);
            self.stopped.push((id, fade));
        }

        fn set_master_gain(&mut self, gain: f32, _ramp: f32) {
            self.gains.push(gain);
        }

        fn stop_all(&mut self, _fade: f32) {
            self.playing.clear();
            self.stop_all_calls += 1;
        }

        fn drain_finished(&mut self) -> Vec<VoiceId> {
            std::mem::take(&mut self.finished)
        }
    }

    fn engine(instrument: &str) -> PlaybackEngine<MockOutput> {
        let notes = vec!["C4".to_string(), "D4".to_string()];
        let catalog = InstrumentCatalog::builtin(&notes);
        let mut engine = PlaybackEngine::new(MockOutput::default(), catalog, notes, None);
        engine.load_instrument(instrument);
        for note in ["C4", "D4"] {
            let generation = engine.generation();
            engine.accept(LoadedSample {
                generation,
                note: note.into(),
                buffer: SampleBuffer::new(vec![0.5; 8], 8_000),
            });
        }
        engine
    }

    #[test]
    fn attack_retrigger_keeps_one_voice() {
        let mut e = engine("piano");
        e.on_attack("C4");
        e.on_attack("C4");

        let out = e.output();
        assert_eq!(out.playing.len(), 1);
        assert_eq!(out.started.len(), 2);
        assert_eq!(out.stopped, vec![(1, RETRIGGER_FADE_SECS)]);
        assert_eq!(e.active_voice("C4"), Some(2));
        assert!(out.started.iter().all(|(_, looping, fade)| !looping && *fade == VOICE_FADE_IN_SECS));
    }

    #[test]
    fn attack_instrument_ignores_hold_and_release() {
        let mut e = engine("piano");
        e.on_attack("C4");
        e.on_sustained_hold("C4");
        e.on_release("C4");
        assert_eq!(e.output().started.len(), 1);
        assert!(e.output().stopped.is_empty());
    }

    #[test]
    fn sustain_hold_is_idempotent() {
        let mut e = engine("mellotron");
        e.on_attack("C4");
        for _ in 0..100 {
            e.on_sustained_hold("C4");
        }
        assert_eq!(e.output().started.len(), 1);
        assert!(e.output().started[0].1, "sustain voices loop");

        e.on_release("C4");
        assert_eq!(e.output().stopped, vec![(1, DEFAULT_RELEASE_FADE_SECS)]);
        assert!(e.output().playing.is_empty());
        assert_eq!(e.active_voice("C4"), None);
    }

    #[test]
    fn late_sample_starts_on_a_held_frame() {
        let mut e = engine("synth");
        e.on_attack("E4");
        assert!(e.output().started.is_empty());

        let generation = e.generation();
        e.accept(LoadedSample {
            generation,
            note: "E4".into(),
            buffer: SampleBuffer::new(vec![0.1; 4], 8_000),
        });
        e.on_sustained_hold("E4");
        assert_eq!(e.output().started.len(), 1);
    }

    #[test]
    fn missing_sample_is_a_silent_no_op() {
        let mut e = engine("piano");
        e.on_attack("B6");
        e.on_release("B6");
        assert!(e.output().started.is_empty());
        assert_eq!(e.active_count(), 0);
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut e = engine("piano");
        let old = e.generation();
        e.load_instrument("synth");
        assert_eq!(e.loaded_count(), 0);
        assert_eq!(e.output().stop_all_calls, 2);

        let stale = LoadedSample {
            generation: old,
            note: "C4".into(),
            buffer: SampleBuffer::new(vec![1.0; 4], 8_000),
        };
        assert!(!e.accept(stale));
        assert!(!e.is_loaded("C4"));
        e.on_attack("C4");
        assert!(e.output().started.is_empty());
    }

    #[test]
    fn volume_and_mute_drive_master_gain() {
        let mut e = engine("piano");
        e.set_volume(0.8);
        e.set_muted(true);
        e.set_volume(1.5);
        e.set_muted(false);
        let gains = &e.output().gains;
        assert_eq!(gains[0], DEFAULT_VOLUME);
        assert_eq!(&gains[1..], &[0.8, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn finished_voices_leave_the_active_map() {
        let mut e = engine("piano");
        e.on_attack("C4");
        e.on_attack("D4");
        e.output.finished = vec![1];
        e.poll();
        assert_eq!(e.active_voice("C4"), None);
        assert_eq!(e.active_voice("D4"), Some(2));
    }

    #[test]
    fn events_dispatch_by_edge() {
        let mut e = engine("mellotron");
        let events = NoteEvents {
            attacks: vec!["C4".into()],
            sustained: vec!["D4".into()],
            releases: vec![],
        };
        e.apply(&events);
        // D4 was held without a voice, so the hold starts it
        assert_eq!(e.output().started.len(), 2);

        e.apply(&NoteEvents {
            releases: vec!["C4".into(), "D4".into()],
            ..NoteEvents::default()
        });
        assert!(e.output().playing.is_empty());
        assert_eq!(e.active_count(), 0);
    }
}
