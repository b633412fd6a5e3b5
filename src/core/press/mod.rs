//! Press detection: deciding whether a fingertip hovering over a key is
//! deliberately pressing it.
//!
//! Two interchangeable strategies live behind [`PressDetector`]:
//! [`VelocityCurlDetector`] scores the motion between two frames, and
//! [`PoseDetector`] classifies the current pose alone. Sensitivity is
//! always 0 = strict, 1 = lenient.

mod pose;
mod velocity;

pub use pose::PoseDetector;
pub use velocity::{VelocityCurlDetector, VelocityThresholds};

use serde::{Deserialize, Serialize};

use crate::core::landmark::{FingerSlot, Hand, Landmark};

/// Everything a detector may look at for one fingertip in one frame.
#[derive(Debug, Clone, Copy)]
pub struct FingerContext<'a> {
    pub slot: FingerSlot,
    /// Key under the fingertip. Detection never runs without one.
    pub note: &'a str,
    pub hand: &'a Hand,
    /// Same hand slot in the previous smoothed frame, if it existed.
    pub previous: Option<&'a Hand>,
    pub sensitivity: f32,
}

impl<'a> FingerContext<'a> {
    pub fn tip(&self) -> Option<&'a Landmark> {
        self.hand.landmark(self.slot.role.tip())
    }

    pub fn proximal(&self) -> Option<&'a Landmark> {
        self.hand.landmark(self.slot.role.proximal())
    }

    pub fn base(&self) -> Option<&'a Landmark> {
        self.hand.landmark(self.slot.role.base())
    }

    pub fn wrist(&self) -> Option<&'a Landmark> {
        self.hand.landmark(crate::core::landmark::WRIST)
    }

    pub fn previous_tip(&self) -> Option<&'a Landmark> {
        self.previous.and_then(|h| h.landmark(self.slot.role.tip()))
    }

    pub fn previous_base(&self) -> Option<&'a Landmark> {
        self.previous.and_then(|h| h.landmark(self.slot.role.base()))
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity.clamp(0.0, 1.0)
    }
}

/// Outcome of evaluating one fingertip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressDecision {
    Pressed,
    NotPressed,
    /// A joint the algorithm needs is missing from the current hand.
    Malformed,
}

impl PressDecision {
    pub fn from_bool(pressed: bool) -> Self {
        if pressed {
            PressDecision::Pressed
        } else {
            PressDecision::NotPressed
        }
    }

    pub fn is_pressed(&self) -> bool {
        *self == PressDecision::Pressed
    }
}

pub trait PressDetector: Send {
    fn algorithm(&self) -> PressAlgorithm;

    fn evaluate(&self, ctx: &FingerContext<'_>) -> PressDecision;
}

/// Configuration selector for the detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressAlgorithm {
    #[default]
    Velocity,
    Pose,
}

impl PressAlgorithm {
    pub fn detector(&self) -> Box<dyn PressDetector> {
        match self {
            PressAlgorithm::Velocity => Box::new(VelocityCurlDetector::default()),
            PressAlgorithm::Pose => Box::new(PoseDetector::default()),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "velocity" | "curl" | "a" => Some(PressAlgorithm::Velocity),
            "pose" | "angle" | "b" => Some(PressAlgorithm::Pose),
            _ => None,
        }
    }
}

/// Linear ramp from 0 at `low` to 1 at `high`, clamped.
pub(crate) fn ramp(value: f32, low: f32, high: f32) -> f32 {
    if high <= low {
        return if value >= high { 1.0 } else { 0.0 };
    }
    ((value - low) / (high - low)).clamp(0.0, 1.0)
}
