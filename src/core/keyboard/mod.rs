//! Static geometry of the virtual keyboard.

mod hit;
mod notes;

pub use hit::{DisplayTransform, HitTester, KeyboardPlacement, Viewport, DEFAULT_BAND_FRACTION};
pub use notes::{
    default_notes, flat_name, midi_note_to_freq, note_name, note_range, parse_note, NoteSpec,
    DEFAULT_FIRST_NOTE, DEFAULT_LAST_NOTE,
};

use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    White,
    Black,
}

/// Axis-aligned rectangle in keyboard-local units. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PianoKey {
    pub note: String,
    pub kind: KeyKind,
    pub frequency: f32,
    pub rect: Rect,
}

/// Fixed key sizes in keyboard-local units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyDimensions {
    pub white_width: f32,
    pub white_height: f32,
    pub black_width: f32,
    pub black_height: f32,
}

impl Default for KeyDimensions {
    fn default() -> Self {
        Self {
            white_width: 40.0,
            white_height: 150.0,
            black_width: 24.0,
            black_height: 90.0,
        }
    }
}

/// Immutable, ordered set of keys built once from a note list.
#[derive(Debug, Clone)]
pub struct KeyboardLayout {
    keys: Vec<PianoKey>,
    width: f32,
    height: f32,
}

impl KeyboardLayout {
    /// Lay out white keys left to right and straddle each sharp over the
    /// boundary to its left. Fails on duplicate note ids.
    pub fn build(notes: &[NoteSpec], dims: KeyDimensions) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in notes {
            if !seen.insert(spec.note.as_str()) {
                bail!("duplicate note '{}' in keyboard layout", spec.note);
            }
        }
        Ok(Self::lay_out(notes, dims))
    }

    /// C4..B6 with the reference key sizes.
    pub fn standard() -> Self {
        Self::lay_out(&default_notes(), KeyDimensions::default())
    }

    fn lay_out(notes: &[NoteSpec], dims: KeyDimensions) -> Self {
        let mut keys = Vec::with_capacity(notes.len());
        let mut cursor = 0.0f32;

        for spec in notes {
            if spec.is_sharp() {
                keys.push(PianoKey {
                    note: spec.note.clone(),
                    kind: KeyKind::Black,
                    frequency: spec.frequency,
                    rect: Rect::new(
                        cursor - dims.black_width / 2.0,
                        0.0,
                        dims.black_width,
                        dims.black_height,
                    ),
                });
            } else {
                keys.push(PianoKey {
                    note: spec.note.clone(),
                    kind: KeyKind::White,
                    frequency: spec.frequency,
                    rect: Rect::new(cursor, 0.0, dims.white_width, dims.white_height),
                });
                cursor += dims.white_width;
            }
        }

        Self {
            keys,
            width: cursor,
            height: dims.white_height,
        }
    }

    pub fn keys(&self) -> &[PianoKey] {
        &self.keys
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn key(&self, note: &str) -> Option<&PianoKey> {
        self.keys.iter().find(|k| k.note == note)
    }

    pub fn contains(&self, note: &str) -> bool {
        self.key(note).is_some()
    }

    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.note.as_str())
    }

    /// Key under a keyboard-local point. Black keys sit on top of the
    /// whites, so they are tested first.
    pub fn key_at(&self, x: f32, y: f32) -> Option<&PianoKey> {
        self.keys_of(KeyKind::Black)
            .find(|k| k.rect.contains(x, y))
            .or_else(|| self.keys_of(KeyKind::White).find(|k| k.rect.contains(x, y)))
    }

    fn keys_of(&self, kind: KeyKind) -> impl Iterator<Item = &PianoKey> {
        self.keys.iter().filter(move |k| k.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_octave() -> KeyboardLayout {
        KeyboardLayout::build(&note_range("C4", "B4").unwrap(), KeyDimensions::default()).unwrap()
    }

    #[test]
    fn builds_white_and_black_geometry() {
        let layout = one_octave();
        assert_eq!(layout.width(), 7.0 * 40.0);
        assert_eq!(layout.height(), 150.0);

        let c = layout.key("C4").unwrap();
        assert_eq!(c.kind, KeyKind::White);
        assert_eq!(c.rect, Rect::new(0.0, 0.0, 40.0, 150.0));

        let c_sharp = layout.key("C#4").unwrap();
        assert_eq!(c_sharp.kind, KeyKind::Black);
        assert_eq!(c_sharp.rect, Rect::new(28.0, 0.0, 24.0, 90.0));

        let f_sharp = layout.key("F#4").unwrap();
        assert_eq!(f_sharp.rect.x, 4.0 * 40.0 - 12.0);
    }

    #[test]
    fn standard_layout_has_unique_notes() {
        let layout = KeyboardLayout::standard();
        assert_eq!(layout.keys().len(), 36);
        assert_eq!(layout.width(), 21.0 * 40.0);
        let unique: HashSet<_> = layout.notes().collect();
        assert_eq!(unique.len(), 36);
    }

    #[test]
    fn rejects_duplicate_notes() {
        let notes = vec![NoteSpec::new("C4", 261.63), NoteSpec::new("C4", 261.63)];
        assert!(KeyboardLayout::build(&notes, KeyDimensions::default()).is_err());
    }

    #[test]
    fn key_centers_resolve_to_their_key() {
        let layout = one_octave();
        for key in layout.keys() {
            let (x, y) = key.rect.center();
            assert_eq!(layout.key_at(x, y).map(|k| k.note.as_str()), Some(key.note.as_str()));
        }
    }

    #[test]
    fn overlap_prefers_black_key() {
        let layout = one_octave();
        // inside both C4 (0..40) and C#4 (28..52)
        assert_eq!(layout.key_at(35.0, 40.0).unwrap().note, "C#4");
        // below the black key only C4 remains
        assert_eq!(layout.key_at(35.0, 120.0).unwrap().note, "C4");
        assert!(layout.key_at(500.0, 40.0).is_none());
        assert!(layout.key_at(20.0, 151.0).is_none());
    }
}
