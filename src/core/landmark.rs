//! Hand skeleton data delivered by the landmark detector.
//!
//! Indices follow the 21-point hand convention: 0 is the wrist, then four
//! joints per finger from the knuckle out to the tip.

use serde::{Deserialize, Serialize};

pub const LANDMARKS_PER_HAND: usize = 21;
pub const MAX_HANDS: usize = 2;

pub const WRIST: usize = 0;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// One tracked point in detector-normalized space.
///
/// `x` and `y` are in [0, 1] with `y` growing downward; `z` is relative
/// depth where smaller values are closer to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, visibility: None }
    }

    /// Distance in the image plane, ignoring depth.
    pub fn planar_distance(&self, other: &Landmark) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A single detected hand. Normally holds exactly [`LANDMARKS_PER_HAND`]
/// points; shorter hands are tolerated and fingertips whose joints are
/// missing are skipped downstream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hand {
    pub landmarks: Vec<Landmark>,
}

impl Hand {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// Detector output for one video frame. Hands are slot-indexed; a slot is
/// not a stable identity across frames.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Milliseconds on the detector's clock.
    pub timestamp_ms: f64,
    #[serde(default)]
    pub hands: Vec<Hand>,
}

impl Frame {
    pub fn new(timestamp_ms: f64, hands: Vec<Hand>) -> Self {
        Self { timestamp_ms, hands }
    }

    pub fn empty(timestamp_ms: f64) -> Self {
        Self { timestamp_ms, hands: Vec::new() }
    }
}

/// The five trackable fingertips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FingerRole {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl FingerRole {
    pub const ALL: [FingerRole; 5] = [
        FingerRole::Thumb,
        FingerRole::Index,
        FingerRole::Middle,
        FingerRole::Ring,
        FingerRole::Pinky,
    ];

    pub fn tip(&self) -> usize {
        match self {
            FingerRole::Thumb => THUMB_TIP,
            FingerRole::Index => INDEX_TIP,
            FingerRole::Middle => MIDDLE_TIP,
            FingerRole::Ring => RING_TIP,
            FingerRole::Pinky => PINKY_TIP,
        }
    }

    /// Joint directly below the tip in the chain used for curl and bend.
    /// For the thumb this is the interphalangeal joint.
    pub fn proximal(&self) -> usize {
        match self {
            FingerRole::Thumb => THUMB_IP,
            FingerRole::Index => INDEX_PIP,
            FingerRole::Middle => MIDDLE_PIP,
            FingerRole::Ring => RING_PIP,
            FingerRole::Pinky => PINKY_PIP,
        }
    }

    /// Knuckle at the base of the finger.
    pub fn base(&self) -> usize {
        match self {
            FingerRole::Thumb => THUMB_MCP,
            FingerRole::Index => INDEX_MCP,
            FingerRole::Middle => MIDDLE_MCP,
            FingerRole::Ring => RING_MCP,
            FingerRole::Pinky => PINKY_MCP,
        }
    }
}

/// One trackable fingertip: a hand slot plus a finger role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FingerSlot {
    pub hand: usize,
    pub role: FingerRole,
}

impl FingerSlot {
    pub fn new(hand: usize, role: FingerRole) -> Self {
        Self { hand, role }
    }
}
