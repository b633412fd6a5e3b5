//! Note naming and equal-tempered frequencies.

use anyhow::{anyhow, Result};

const NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// First and last note of the default keyboard.
pub const DEFAULT_FIRST_NOTE: &str = "C4";
pub const DEFAULT_LAST_NOTE: &str = "B6";

/// A note id together with its pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSpec {
    pub note: String,
    pub frequency: f32,
}

impl NoteSpec {
    pub fn new(note: impl Into<String>, frequency: f32) -> Self {
        Self { note: note.into(), frequency }
    }

    pub fn is_sharp(&self) -> bool {
        self.note.contains('#')
    }
}

/// Convert a MIDI note number to its frequency in Hz
pub fn midi_note_to_freq(note: u8) -> f32 {
    // A4 (note 69) is 440 Hz
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

/// Parse an id such as `C4` or `F#5` into a MIDI note number.
pub fn parse_note(note: &str) -> Result<u8> {
    let split = note
        .find(|c: char| c.is_ascii_digit() || c == '-')
        .ok_or_else(|| anyhow!("note '{}' has no octave", note))?;
    let (name, octave) = note.split_at(split);
    let pitch_class = NAMES
        .iter()
        .position(|n| *n == name)
        .or_else(|| FLAT_NAMES.iter().position(|n| *n == name))
        .ok_or_else(|| anyhow!("unknown note name '{}'", name))?;
    let octave: i32 = octave
        .parse()
        .map_err(|_| anyhow!("bad octave in note '{}'", note))?;
    let midi = (octave + 1) * 12 + pitch_class as i32;
    u8::try_from(midi)
        .ok()
        .filter(|m| *m <= 127)
        .ok_or_else(|| anyhow!("note '{}' is outside the MIDI range", note))
}

/// Sharp-spelled id for a MIDI note number, e.g. 61 -> `C#4`.
pub fn note_name(midi: u8) -> String {
    let octave = midi as i32 / 12 - 1;
    format!("{}{}", NAMES[midi as usize % 12], octave)
}

/// Flat spelling used by sample libraries, e.g. `C#4` -> `Db4`.
pub fn flat_name(note: &str) -> Result<String> {
    let midi = parse_note(note)?;
    let octave = midi as i32 / 12 - 1;
    Ok(format!("{}{}", FLAT_NAMES[midi as usize % 12], octave))
}

/// Every chromatic note from `first` to `last` inclusive.
pub fn note_range(first: &str, last: &str) -> Result<Vec<NoteSpec>> {
    let lo = parse_note(first)?;
    let hi = parse_note(last)?;
    if lo > hi {
        return Err(anyhow!("note range {}..{} is reversed", first, last));
    }
    Ok((lo..=hi)
        .map(|midi| NoteSpec::new(note_name(midi), midi_note_to_freq(midi)))
        .collect())
}

/// The default three-octave range.
pub fn default_notes() -> Vec<NoteSpec> {
    note_range(DEFAULT_FIRST_NOTE, DEFAULT_LAST_NOTE).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sharps_and_flats() {
        assert_eq!(parse_note("C4").unwrap(), 60);
        assert_eq!(parse_note("C#4").unwrap(), 61);
        assert_eq!(parse_note("Db4").unwrap(), 61);
        assert_eq!(parse_note("A4").unwrap(), 69);
        assert_eq!(parse_note("B6").unwrap(), 95);
        assert!(parse_note("H4").is_err());
        assert!(parse_note("C").is_err());
    }

    #[test]
    fn frequencies_match_reference_table() {
        let notes = default_notes();
        assert_eq!(notes.len(), 36);
        assert_eq!(notes[0].note, DEFAULT_FIRST_NOTE);
        assert!((notes[0].frequency - 261.63).abs() < 0.01);
        assert!((notes[35].frequency - 1975.53).abs() < 0.01);
        assert_eq!(notes[35].note, DEFAULT_LAST_NOTE);
    }

    #[test]
    fn flat_spelling_for_sample_names() {
        assert_eq!(flat_name("C#4").unwrap(), "Db4");
        assert_eq!(flat_name("A#6").unwrap(), "Bb6");
        assert_eq!(flat_name("E5").unwrap(), "E5");
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let octave = note_range("C4", "B4").unwrap();
        assert_eq!(octave.len(), 12);
        assert_eq!(octave.iter().filter(|n| n.is_sharp()).count(), 5);
        assert!(note_range("B4", "C4").is_err());
    }
}
