use std::collections::BTreeSet;

/// Per-note state implied by two consecutive held sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Silent,
    Attacking,
    Sustained,
    Releasing,
}

impl NoteState {
    pub fn between(was_held: bool, is_held: bool) -> Self {
        match (was_held, is_held) {
            (false, false) => NoteState::Silent,
            (false, true) => NoteState::Attacking,
            (true, true) => NoteState::Sustained,
            (true, false) => NoteState::Releasing,
        }
    }
}

/// Note ids judged pressed in one frame. Rebuilt from scratch every
/// frame; several fingers on one key collapse to one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldKeySet {
    notes: BTreeSet<String>,
}

impl HeldKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, note: &str) -> bool {
        if self.notes.contains(note) {
            return false;
        }
        self.notes.insert(note.to_string())
    }

    pub fn contains(&self, note: &str) -> bool {
        self.notes.contains(note)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.notes.iter().map(String::as_str)
    }

    pub fn state_of(&self, previous: &HeldKeySet, note: &str) -> NoteState {
        NoteState::between(previous.contains(note), self.contains(note))
    }
}

impl<S: AsRef<str>> FromIterator<S> for HeldKeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            notes: iter.into_iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

/// Edges derived from one frame-to-frame comparison, each list sorted by
/// note id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteEvents {
    pub attacks: Vec<String>,
    pub sustained: Vec<String>,
    pub releases: Vec<String>,
}

impl NoteEvents {
    /// Diff two held sets. Pure: no state beyond the two inputs.
    pub fn diff(previous: &HeldKeySet, current: &HeldKeySet) -> Self {
        let attacks = current.notes.difference(&previous.notes).cloned().collect();
        let sustained = current.notes.intersection(&previous.notes).cloned().collect();
        let releases = previous.notes.difference(&current.notes).cloned().collect();
        Self { attacks, sustained, releases }
    }

    /// True when nothing started or stopped.
    pub fn is_quiet(&self) -> bool {
        self.attacks.is_empty() && self.releases.is_empty()
    }
}

/// Carries the previous frame's held set so each frame can be diffed
/// against it.
#[derive(Debug, Clone, Default)]
pub struct NoteTracker {
    previous: HeldKeySet,
}

impl NoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, current: HeldKeySet) -> NoteEvents {
        let events = NoteEvents::diff(&self.previous, &current);
        self.previous = current;
        events
    }

    pub fn held(&self) -> &HeldKeySet {
        &self.previous
    }

    /// Forget the last held set and return the releases that implies.
    pub fn clear(&mut self) -> NoteEvents {
        self.advance(HeldKeySet::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(notes: &[&str]) -> HeldKeySet {
        notes.iter().collect()
    }

    #[test]
    fn held_sequence_produces_one_attack_and_one_release() {
        let frames = [set(&[]), set(&["C4"]), set(&["C4"]), set(&[])];
        let mut tracker = NoteTracker::new();
        let mut edges = Vec::new();
        for (i, frame) in frames.iter().enumerate() {
            let events = tracker.advance(frame.clone());
            for note in &events.attacks {
                edges.push(("attack", note.clone(), i + 1));
            }
            for note in &events.releases {
                edges.push(("release", note.clone(), i + 1));
            }
        }
        assert_eq!(
            edges,
            vec![("attack", "C4".to_string(), 2), ("release", "C4".to_string(), 4)]
        );
    }

    #[test]
    fn unchanged_set_is_quiet() {
        let a = set(&["C4", "E4"]);
        let events = NoteEvents::diff(&a, &a);
        assert!(events.is_quiet());
        assert_eq!(events.sustained, vec!["C4".to_string(), "E4".to_string()]);
    }

    #[test]
    fn overlapping_sets_split_into_edges() {
        let events = NoteEvents::diff(&set(&["C4", "D4"]), &set(&["D4", "E4"]));
        assert_eq!(events.attacks, vec!["E4".to_string()]);
        assert_eq!(events.sustained, vec!["D4".to_string()]);
        assert_eq!(events.releases, vec!["C4".to_string()]);
    }

    #[test]
    fn duplicate_inserts_collapse() {
        let mut held = HeldKeySet::new();
        assert!(held.insert("C4"));
        assert!(!held.insert("C4"));
        assert_eq!(held.len(), 1);
    }

    #[test]
    fn note_state_follows_membership() {
        let prev = set(&["C4"]);
        let now = set(&["C4", "G4"]);
        assert_eq!(now.state_of(&prev, "C4"), NoteState::Sustained);
        assert_eq!(now.state_of(&prev, "G4"), NoteState::Attacking);
        assert_eq!(set(&[]).state_of(&prev, "C4"), NoteState::Releasing);
        assert_eq!(now.state_of(&prev, "A4"), NoteState::Silent);
    }

    #[test]
    fn clear_releases_everything() {
        let mut tracker = NoteTracker::new();
        tracker.advance(set(&["C4", "D4"]));
        let events = tracker.clear();
        assert_eq!(events.releases.len(), 2);
        assert!(tracker.held().is_empty());
    }
}
