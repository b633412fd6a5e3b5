use log::trace;

use crate::core::landmark::{Frame, Hand, Landmark};

/// Default blend factor between the new sample and the previous output.
pub const DEFAULT_SMOOTHING: f32 = 0.5;

/// One-pole exponential filter over every hand, landmark and axis.
///
/// History only survives while the detected hand count stays the same.
/// When the count changes the slot correspondence is meaningless, so the
/// state is reseeded from the raw frame instead of blended.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    alpha: f32,
    state: Vec<Hand>,
}

impl LandmarkSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: Vec::new(),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Feed one raw frame and return the smoothed hands.
    pub fn update(&mut self, frame: &Frame) -> &[Hand] {
        if self.state.len() != frame.hands.len() {
            trace!(
                "hand count changed {} -> {}, reseeding smoother",
                self.state.len(),
                frame.hands.len()
            );
        }
        self.state = smooth(&self.state, &frame.hands, self.alpha);
        &self.state
    }

    /// Last smoothed output.
    pub fn current(&self) -> &[Hand] {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.clear();
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING)
    }
}

/// Pure filter step: `alpha * raw + (1 - alpha) * previous`.
///
/// Returns a copy of `raw` when the hand count differs from `previous`, and
/// an empty vector when no hands were detected.
pub fn smooth(previous: &[Hand], raw: &[Hand], alpha: f32) -> Vec<Hand> {
    if raw.len() != previous.len() {
        return raw.to_vec();
    }

    raw.iter()
        .zip(previous)
        .map(|(new_hand, old_hand)| {
            if new_hand.len() != old_hand.len() {
                return new_hand.clone();
            }
            let landmarks = new_hand
                .landmarks
                .iter()
                .zip(&old_hand.landmarks)
                .map(|(new_pt, old_pt)| blend(new_pt, old_pt, alpha))
                .collect();
            Hand::new(landmarks)
        })
        .collect()
}

fn blend(new_pt: &Landmark, old_pt: &Landmark, alpha: f32) -> Landmark {
    Landmark {
        x: alpha * new_pt.x + (1.0 - alpha) * old_pt.x,
        y: alpha * new_pt.y + (1.0 - alpha) * old_pt.y,
        z: alpha * new_pt.z + (1.0 - alpha) * old_pt.z,
        visibility: new_pt.visibility,
    }
}
