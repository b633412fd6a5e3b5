use std::f32::consts::FRAC_PI_2;

use log::trace;

use super::{FingerContext, PressAlgorithm, PressDecision, PressDetector};
use crate::core::landmark::Landmark;

const MIN_SEGMENT: f32 = 1e-6;

/// Stateless pose classifier.
///
/// The tip counts as pressed when it hangs far enough below its proximal
/// joint and points toward the camera relative to the wrist. The drop is
/// measured in units of the proximal-to-knuckle segment and boosted by
/// how sharply the proximal joint is bent, then compared to
/// `1 - sensitivity`.
#[derive(Debug, Clone, Default)]
pub struct PoseDetector;

impl PoseDetector {
    /// Bend-weighted drop of the tip below its proximal joint.
    pub fn drop_score(tip: &Landmark, proximal: &Landmark, base: &Landmark) -> Option<f32> {
        let segment = proximal.planar_distance(base);
        if segment < MIN_SEGMENT {
            return None;
        }
        let drop = (tip.y - proximal.y) / segment;
        Some(drop * (1.0 + bend(tip, proximal, base)))
    }
}

/// Angle at the proximal joint between the knuckle segment and the tip
/// segment, 0 for a straight finger and 1 at a right angle or more.
fn bend(tip: &Landmark, proximal: &Landmark, base: &Landmark) -> f32 {
    let (ax, ay) = (proximal.x - base.x, proximal.y - base.y);
    let (bx, by) = (tip.x - proximal.x, tip.y - proximal.y);
    let len = ax.hypot(ay) * bx.hypot(by);
    if len < MIN_SEGMENT * MIN_SEGMENT {
        return 0.0;
    }
    let cos = ((ax * bx + ay * by) / len).clamp(-1.0, 1.0);
    (cos.acos() / FRAC_PI_2).min(1.0)
}

impl PressDetector for PoseDetector {
    fn algorithm(&self) -> PressAlgorithm {
        PressAlgorithm::Pose
    }

    fn evaluate(&self, ctx: &FingerContext<'_>) -> PressDecision {
        let (Some(tip), Some(proximal), Some(base), Some(wrist)) =
            (ctx.tip(), ctx.proximal(), ctx.base(), ctx.wrist())
        else {
            return PressDecision::Malformed;
        };

        let below = match Self::drop_score(tip, proximal, base) {
            Some(score) => score > 1.0 - ctx.sensitivity(),
            None => false,
        };
        let toward_camera = tip.z < wrist.z;
        trace!(
            "{:?} over {}: below {} toward camera {}",
            ctx.slot,
            ctx.note,
            below,
            toward_camera
        );

        PressDecision::from_bool(below && toward_camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::landmark::{
        FingerRole, FingerSlot, Hand, INDEX_MCP, INDEX_PIP, INDEX_TIP, WRIST,
    };

    fn hand(tip: Landmark, pip: Landmark, mcp: Landmark, wrist_z: f32) -> Hand {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); 21];
        points[WRIST] = Landmark::new(0.5, 0.3, wrist_z);
        points[INDEX_MCP] = mcp;
        points[INDEX_PIP] = pip;
        points[INDEX_TIP] = tip;
        Hand::new(points)
    }

    fn evaluate(hand: &Hand, sensitivity: f32) -> PressDecision {
        let ctx = FingerContext {
            slot: FingerSlot::new(0, FingerRole::Index),
            note: "C4",
            hand,
            previous: None,
            sensitivity,
        };
        PoseDetector.evaluate(&ctx)
    }

    #[test]
    fn curled_finger_pointing_at_camera_presses() {
        // knuckle -> pip runs right, pip -> tip drops straight down
        let h = hand(
            Landmark::new(0.6, 0.6, -0.05),
            Landmark::new(0.6, 0.5, -0.02),
            Landmark::new(0.5, 0.5, 0.0),
            0.0,
        );
        assert_eq!(evaluate(&h, 0.0), PressDecision::Pressed);
    }

    #[test]
    fn finger_pointing_away_is_rejected() {
        let h = hand(
            Landmark::new(0.6, 0.6, 0.05),
            Landmark::new(0.6, 0.5, 0.02),
            Landmark::new(0.5, 0.5, 0.0),
            0.0,
        );
        assert_eq!(evaluate(&h, 1.0), PressDecision::NotPressed);
    }

    #[test]
    fn slight_drop_needs_high_sensitivity() {
        // straight finger, tip just below the pip
        let h = hand(
            Landmark::new(0.5, 0.62, -0.05),
            Landmark::new(0.5, 0.6, -0.02),
            Landmark::new(0.5, 0.5, 0.0),
            0.0,
        );
        assert_eq!(evaluate(&h, 0.0), PressDecision::NotPressed);
        assert_eq!(evaluate(&h, 0.9), PressDecision::Pressed);
    }

    #[test]
    fn missing_joints_are_malformed() {
        let short = Hand::new(vec![Landmark::default(); 7]);
        assert_eq!(evaluate(&short, 0.5), PressDecision::Malformed);
    }

    #[test]
    fn degenerate_segment_does_not_press() {
        let p = Landmark::new(0.5, 0.5, -0.1);
        let h = hand(Landmark::new(0.5, 0.9, -0.1), p, p, 0.0);
        assert_eq!(evaluate(&h, 1.0), PressDecision::NotPressed);
    }
}
