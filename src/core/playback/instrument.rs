use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use super::tone::Waveform;
use crate::core::keyboard::flat_name;

pub const DEFAULT_INSTRUMENT: &str = "piano";

/// How an instrument's voices behave over the life of a held note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// One-shot sample that decays on its own.
    Attack,
    /// Looped sample that sounds for as long as the note is held.
    Sustain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub name: String,
    pub envelope: EnvelopeKind,
    /// Waveform used when the instrument is rendered procedurally.
    #[serde(default)]
    pub waveform: Waveform,
    /// Note id -> sample reference. Notes missing here fall back to the
    /// flat spelling of the note, e.g. `C#4` -> `Db4`.
    #[serde(default)]
    pub samples: BTreeMap<String, String>,
}

impl Instrument {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        envelope: EnvelopeKind,
        waveform: Waveform,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            envelope,
            waveform,
            samples: BTreeMap::new(),
        }
    }

    /// Map every given note to its flat-spelled sample name.
    pub fn with_notes<I, S>(mut self, notes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for note in notes {
            let note = note.as_ref();
            if let Ok(sample) = flat_name(note) {
                self.samples.insert(note.to_string(), sample);
            }
        }
        self
    }

    pub fn sample_ref(&self, note: &str) -> Option<String> {
        match self.samples.get(note) {
            Some(sample) => Some(sample.clone()),
            None if self.samples.is_empty() => flat_name(note).ok(),
            None => None,
        }
    }

    pub fn is_sustained(&self) -> bool {
        self.envelope == EnvelopeKind::Sustain
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentCatalog {
    #[serde(default = "default_instrument_id")]
    pub default: String,
    pub instruments: Vec<Instrument>,
}

fn default_instrument_id() -> String {
    DEFAULT_INSTRUMENT.to_string()
}

impl InstrumentCatalog {
    /// Piano, mellotron and synth pad, each covering `notes`.
    pub fn builtin<I, S>(notes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let notes: Vec<String> = notes.into_iter().map(|n| n.as_ref().to_string()).collect();
        Self {
            default: default_instrument_id(),
            instruments: vec![
                Instrument::new("piano", "Acoustic Piano", EnvelopeKind::Attack, Waveform::Triangle)
                    .with_notes(&notes),
                Instrument::new("mellotron", "Mellotron Organ", EnvelopeKind::Sustain, Waveform::Sine)
                    .with_notes(&notes),
                Instrument::new("synth", "Warm Synth Pad", EnvelopeKind::Sustain, Waveform::Saw)
                    .with_notes(&notes),
            ],
        }
    }

    /// Load a catalog from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open instrument catalog: {}", path.display()))?;
        let catalog: InstrumentCatalog = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse instrument catalog: {}", path.display()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        if self.instruments.is_empty() {
            bail!("instrument catalog is empty");
        }
        if self.get(&self.default).is_none() {
            bail!("default instrument '{}' is not in the catalog", self.default);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.id == id)
    }

    /// Look up `id`, falling back to the default instrument. `None` only
    /// for an empty catalog.
    pub fn resolve(&self, id: &str) -> Option<&Instrument> {
        if let Some(instrument) = self.get(id) {
            return Some(instrument);
        }
        warn!("unknown instrument '{}', using '{}'", id, self.default);
        self.get(&self.default).or_else(|| self.instruments.first())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.instruments.iter().map(|i| i.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_catalog_maps_every_note() {
        let catalog = InstrumentCatalog::builtin(["C4", "C#4", "D4"]);
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["piano", "mellotron", "synth"]);

        let piano = catalog.get("piano").unwrap();
        assert_eq!(piano.envelope, EnvelopeKind::Attack);
        assert_eq!(piano.sample_ref("C#4").as_deref(), Some("Db4"));
        assert_eq!(piano.sample_ref("E4"), None);
        assert!(catalog.get("mellotron").unwrap().is_sustained());
    }

    #[test]
    fn unknown_id_falls_back_to_default() {
        let catalog = InstrumentCatalog::builtin(["C4"]);
        assert_eq!(catalog.resolve("harpsichord").unwrap().id, "piano");
        assert_eq!(catalog.resolve("synth").unwrap().id, "synth");
    }

    #[test]
    fn loads_catalog_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "default": "organ",
                "instruments": [
                    {{ "id": "organ", "name": "Organ", "envelope": "sustain", "waveform": "square" }}
                ]
            }}"#
        )
        .unwrap();

        let catalog = InstrumentCatalog::load_from_file(file.path()).unwrap();
        let organ = catalog.resolve("missing").unwrap();
        assert_eq!(organ.id, "organ");
        assert_eq!(organ.waveform, Waveform::Square);
        // no explicit map: every note uses its flat spelling
        assert_eq!(organ.sample_ref("A#5").as_deref(), Some("Bb5"));
    }

    #[test]
    fn catalog_without_its_default_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "instruments": [ {{ "id": "organ", "name": "Organ", "envelope": "sustain" }} ] }}"#
        )
        .unwrap();
        assert!(InstrumentCatalog::load_from_file(file.path()).is_err());
    }
}
