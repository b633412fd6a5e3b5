//! Per-frame pass from raw landmarks to note edges:
//! smoothing, hit-testing, press detection and held-set diffing.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, trace};

use crate::core::keyboard::{DisplayTransform, HitTester, KeyboardLayout, KeyboardPlacement, Viewport};
use crate::core::landmark::{FingerRole, FingerSlot, Frame, Hand, MAX_HANDS};
use crate::core::note::{HeldKeySet, NoteEvents, NoteTracker};
use crate::core::press::{FingerContext, PressAlgorithm, PressDecision, PressDetector};
use crate::core::smoother::{LandmarkSmoother, DEFAULT_SMOOTHING};

/// Values read from configuration at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub algorithm: PressAlgorithm,
    pub sensitivity: f32,
    pub transform: DisplayTransform,
    pub placement: KeyboardPlacement,
    pub viewport: Viewport,
    pub smoothing: f32,
    /// Keep a pressed fingertip held while it stays over the same key.
    pub press_latch: bool,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            algorithm: PressAlgorithm::default(),
            sensitivity: 0.5,
            transform: DisplayTransform {
                flip_horizontal: true,
                flip_vertical: false,
            },
            placement: KeyboardPlacement::default(),
            viewport: Viewport::default(),
            smoothing: DEFAULT_SMOOTHING,
            press_latch: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    pub held: HeldKeySet,
    pub events: NoteEvents,
}

pub struct FramePipeline {
    hit_tester: HitTester,
    smoother: LandmarkSmoother,
    detector: Box<dyn PressDetector>,
    tracker: NoteTracker,
    previous_hands: Vec<Hand>,
    latches: HashMap<FingerSlot, String>,
}

impl FramePipeline {
    pub fn new(layout: Arc<KeyboardLayout>, algorithm: PressAlgorithm) -> Self {
        Self {
            hit_tester: HitTester::new(layout),
            smoother: LandmarkSmoother::default(),
            detector: algorithm.detector(),
            tracker: NoteTracker::new(),
            previous_hands: Vec::new(),
            latches: HashMap::new(),
        }
    }

    pub fn with_band_fraction(mut self, fraction: f32) -> Self {
        self.hit_tester = self.hit_tester.with_band_fraction(fraction);
        self
    }

    pub fn layout(&self) -> &KeyboardLayout {
        self.hit_tester.layout()
    }

    /// Smoothed hands from the most recent frame.
    pub fn hands(&self) -> &[Hand] {
        self.smoother.current()
    }

    pub fn held(&self) -> &HeldKeySet {
        self.tracker.held()
    }

    pub fn process(&mut self, frame: &Frame, settings: &FrameSettings) -> FrameOutput {
        if settings.algorithm != self.detector.algorithm() {
            info!("press detection switched to {:?}", settings.algorithm);
            self.detector = settings.algorithm.detector();
            self.latches.clear();
        }
        self.smoother.set_alpha(settings.smoothing);

        let hands = self.smoother.update(frame).to_vec();
        let slots_continue = hands.len() == self.previous_hands.len();
        if !slots_continue || !settings.press_latch {
            self.latches.clear();
        }

        if hands.len() > MAX_HANDS {
            debug!("{} hands detected, ignoring slots past {}", hands.len(), MAX_HANDS);
        }

        let previous_hands = std::mem::take(&mut self.previous_hands);
        let mut held = HeldKeySet::new();
        for (hand_slot, hand) in hands.iter().enumerate().take(MAX_HANDS) {
            let previous = if slots_continue {
                previous_hands.get(hand_slot)
            } else {
                None
            };
            for role in FingerRole::ALL {
                let slot = FingerSlot::new(hand_slot, role);
                self.evaluate_finger(slot, hand, previous, settings, &mut held);
            }
        }

        self.previous_hands = hands;
        let events = self.tracker.advance(held.clone());
        if !events.is_quiet() {
            debug!("attacks {:?} releases {:?}", events.attacks, events.releases);
        }
        FrameOutput { held, events }
    }

    fn evaluate_finger(
        &mut self,
        slot: FingerSlot,
        hand: &Hand,
        previous: Option<&Hand>,
        settings: &FrameSettings,
        held: &mut HeldKeySet,
    ) {
        let Some(tip) = hand.landmark(slot.role.tip()) else {
            debug!("hand {} has no {:?} tip, skipping", slot.hand, slot.role);
            return;
        };

        let Some(key) = self.hit_tester.hit_test(
            tip.x,
            tip.y,
            settings.viewport,
            settings.transform,
            settings.placement,
        ) else {
            self.latches.remove(&slot);
            return;
        };

        if settings.press_latch {
            match self.latches.get(&slot).map(|latched| *latched == key.note) {
                Some(true) => {
                    held.insert(&key.note);
                    return;
                }
                Some(false) => {
                    self.latches.remove(&slot);
                }
                None => {}
            }
        }

        let ctx = FingerContext {
            slot,
            note: &key.note,
            hand,
            previous,
            sensitivity: settings.sensitivity,
        };
        match self.detector.evaluate(&ctx) {
            PressDecision::Pressed => {
                trace!("{:?} pressed {}", slot, key.note);
                held.insert(&key.note);
                if settings.press_latch {
                    self.latches.insert(slot, key.note.clone());
                }
            }
            PressDecision::NotPressed => {}
            PressDecision::Malformed => {
                debug!("{:?} is missing joints, skipping press check", slot);
            }
        }
    }
}
