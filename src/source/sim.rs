use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::LandmarkSource;
use crate::config::PianoSettings;
use crate::core::keyboard::{KeyKind, KeyboardLayout, KeyboardPlacement};
use crate::core::landmark::{
    FingerRole, Frame, Hand, Landmark, INDEX_MCP, INDEX_PIP, INDEX_TIP, LANDMARKS_PER_HAND, WRIST,
};

const FRAMES_PER_TAP: u64 = 12;
const PRESS_FRAMES: std::ops::Range<u64> = 6..8;
const HOLD_FRAMES: std::ops::Range<u64> = 8..10;
const REACH: f32 = 0.1;
const PRESS_DEPTH_STEP: f32 = 0.005;
const PRESS_CURL_STEP: f32 = 0.006;

/// A synthetic right hand that walks across the white keys, tapping each
/// one with the index finger: hover, press down and curl, hold, lift.
/// Every landmark gets a little random jitter.
pub struct SimulatedSource {
    layout: Arc<KeyboardLayout>,
    placement: KeyboardPlacement,
    flip_horizontal: bool,
    flip_vertical: bool,
    band_fraction: f32,
    rng: StdRng,
    jitter: f32,
    frame: u64,
    frame_interval_ms: f64,
    limit: Option<u64>,
}

impl SimulatedSource {
    pub fn new(layout: Arc<KeyboardLayout>, settings: &PianoSettings, seed: u64) -> Self {
        Self {
            layout,
            placement: settings.placement,
            flip_horizontal: settings.flip_horizontal,
            flip_vertical: settings.flip_vertical,
            band_fraction: settings.band_fraction,
            rng: StdRng::seed_from_u64(seed),
            jitter: 0.0003,
            frame: 0,
            frame_interval_ms: 1000.0 / 60.0,
            limit: None,
        }
    }

    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        if fps > 0.0 {
            self.frame_interval_ms = 1000.0 / fps;
        }
        self
    }

    /// Note the hand is aiming at during frame `frame`.
    pub fn target_note(&self, frame: u64) -> Option<&str> {
        let whites: Vec<&str> = self
            .layout
            .keys()
            .iter()
            .filter(|k| k.kind == KeyKind::White)
            .map(|k| k.note.as_str())
            .collect();
        if whites.is_empty() {
            return None;
        }
        let index = (frame / FRAMES_PER_TAP) as usize % whites.len();
        Some(whites[index])
    }

    /// Display-normalized point for a keyboard-local position.
    fn to_display(&self, local_x: f32, local_y: f32) -> (f32, f32) {
        let x = local_x / self.layout.width();
        let mut rel = local_y / self.layout.height();
        if self.placement == KeyboardPlacement::Bottom {
            rel = 1.0 - rel;
        }
        let band_start = match self.placement {
            KeyboardPlacement::Top => 0.0,
            KeyboardPlacement::Bottom => 1.0 - self.band_fraction,
        };
        (x, band_start + rel * self.band_fraction)
    }

    /// Undo the display flips so the pipeline sees raw detector output.
    fn to_detector(&self, x: f32, y: f32) -> (f32, f32) {
        let x = if self.flip_horizontal { 1.0 - x } else { x };
        let y = if self.flip_vertical { 1.0 - y } else { y };
        (x, y)
    }

    fn hand_at(&mut self, tip_x: f32, tip_y: f32, depth: f32, reach: f32) -> Hand {
        // fingers other than the index are folded back near the wrist,
        // well outside the keyboard band
        let wrist_y = tip_y - 0.3;
        let mut points = vec![Landmark::new(tip_x + 0.02, wrist_y + 0.02, 0.03); LANDMARKS_PER_HAND];
        points[WRIST] = Landmark::new(tip_x, wrist_y, 0.05);
        for role in FingerRole::ALL {
            if role == FingerRole::Index {
                continue;
            }
            let offset = role as usize as f32 * 0.01;
            points[role.tip()] = Landmark::new(tip_x + offset, wrist_y + 0.03, 0.02);
        }
        points[INDEX_MCP] = Landmark::new(tip_x, tip_y - reach, 0.0);
        points[INDEX_PIP] = Landmark::new(tip_x, tip_y - reach * 0.6, depth * 0.5);
        points[INDEX_PIP + 1] = Landmark::new(tip_x, tip_y - reach * 0.3, depth * 0.8);
        points[INDEX_TIP] = Landmark::new(tip_x, tip_y, depth);

        for point in points.iter_mut() {
            let (x, y) = self.to_detector(point.x, point.y);
            point.x = x + self.rng.random_range(-self.jitter..=self.jitter);
            point.y = y + self.rng.random_range(-self.jitter..=self.jitter);
            point.z += self.rng.random_range(-self.jitter..=self.jitter);
        }
        Hand::new(points)
    }
}

impl LandmarkSource for SimulatedSource {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.limit.is_some_and(|limit| self.frame >= limit) {
            return None;
        }
        let frame = self.frame;
        self.frame += 1;
        let timestamp = frame as f64 * self.frame_interval_ms;

        let phase = frame % FRAMES_PER_TAP;
        if phase == 0 {
            // hand briefly leaves the camera between taps
            return Some(Frame::empty(timestamp));
        }

        let key = self
            .target_note(frame)
            .and_then(|note| self.layout.key(note))
            .map(|k| k.rect)?;
        // aim below the black keys so only the white key is under the tip
        let local_y = key.y + key.height * 0.8;
        let (tip_x, tip_y) = self.to_display(key.x + key.width / 2.0, local_y);

        let pressed = if PRESS_FRAMES.contains(&phase) {
            (phase - PRESS_FRAMES.start + 1) as f32
        } else if HOLD_FRAMES.contains(&phase) {
            (PRESS_FRAMES.end - PRESS_FRAMES.start) as f32
        } else {
            0.0
        };
        let depth = -PRESS_DEPTH_STEP * pressed;
        let reach = REACH - PRESS_CURL_STEP * pressed;

        let hand = self.hand_at(tip_x, tip_y, depth, reach);
        Some(Frame::new(timestamp, vec![hand]))
    }
}
