use log::trace;

use super::{ramp, FingerContext, PressAlgorithm, PressDecision, PressDetector};

/// Score bounds for the two motion components, in normalized units per
/// frame. A component reaches full score at its `high` bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityThresholds {
    pub depth_low: f32,
    pub depth_high: f32,
    pub curl_low: f32,
    pub curl_high: f32,
}

impl Default for VelocityThresholds {
    fn default() -> Self {
        Self {
            depth_low: 0.0005,
            depth_high: 0.0035,
            curl_low: 0.0005,
            curl_high: 0.004,
        }
    }
}

/// Rewards a deliberate down-and-curl gesture between two frames.
///
/// Depth velocity is `prev.z - curr.z` (positive moving toward the camera)
/// and curl velocity is how much the tip closed in on its knuckle. Each is
/// mapped to 0..1 and the sum must exceed `1.2 - sensitivity`.
#[derive(Debug, Clone, Default)]
pub struct VelocityCurlDetector {
    pub thresholds: VelocityThresholds,
}

impl VelocityCurlDetector {
    pub fn new(thresholds: VelocityThresholds) -> Self {
        Self { thresholds }
    }

    /// Combined score needed to trigger at a given sensitivity.
    pub fn trigger_threshold(sensitivity: f32) -> f32 {
        1.2 - sensitivity.clamp(0.0, 1.0)
    }

    /// Combined 0..2 motion score, or `None` without two usable frames.
    pub fn score(&self, ctx: &FingerContext<'_>) -> Option<f32> {
        let tip = ctx.tip()?;
        let base = ctx.base()?;
        let prev_tip = ctx.previous_tip()?;
        let prev_base = ctx.previous_base()?;

        let depth_velocity = prev_tip.z - tip.z;
        let curl_velocity = prev_tip.planar_distance(prev_base) - tip.planar_distance(base);

        let t = &self.thresholds;
        Some(
            ramp(depth_velocity, t.depth_low, t.depth_high)
                + ramp(curl_velocity, t.curl_low, t.curl_high),
        )
    }
}

impl PressDetector for VelocityCurlDetector {
    fn algorithm(&self) -> PressAlgorithm {
        PressAlgorithm::Velocity
    }

    fn evaluate(&self, ctx: &FingerContext<'_>) -> PressDecision {
        if ctx.tip().is_none() || ctx.base().is_none() {
            return PressDecision::Malformed;
        }
        match self.score(ctx) {
            Some(score) => {
                trace!("{:?} over {} scored {:.2}", ctx.slot, ctx.note, score);
                PressDecision::from_bool(score > Self::trigger_threshold(ctx.sensitivity()))
            }
            // first frame for this slot
            None => PressDecision::NotPressed,
        }
    }
}
