//! Write-only visualization output. Nothing here is read back by the
//! pipeline.

use log::info;

use crate::core::landmark::Hand;
use crate::core::note::HeldKeySet;

pub trait RenderSink {
    fn render(&mut self, held: &HeldKeySet, hands: &[Hand]);
}

/// Logs the held set whenever it changes.
#[derive(Debug, Default)]
pub struct LogSink {
    last: HeldKeySet,
    hands_seen: usize,
    changes: usize,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of held-set changes rendered so far.
    pub fn changes(&self) -> usize {
        self.changes
    }
}

impl RenderSink for LogSink {
    fn render(&mut self, held: &HeldKeySet, hands: &[Hand]) {
        if hands.len() != self.hands_seen {
            info!("{} hand(s) in view", hands.len());
            self.hands_seen = hands.len();
        }
        if *held != self.last {
            let notes: Vec<&str> = held.iter().collect();
            info!("held: [{}]", notes.join(" "));
            self.last = held.clone();
            self.changes += 1;
        }
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn render(&mut self, _held: &HeldKeySet, _hands: &[Hand]) {}
}
