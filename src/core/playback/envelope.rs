use crate::utils::helpers::seconds_to_samples;

/// Linear gain automation evaluated one sample at a time on the audio
/// clock.
///
/// Scheduling a new ramp always cancels the one in progress and starts
/// from the current value, so two fades can never fight each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainRamp {
    value: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl GainRamp {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Cancel any pending automation and ramp linearly to `target`.
    pub fn ramp_to(&mut self, target: f32, seconds: f32, sample_rate: u32) {
        let samples = seconds_to_samples(seconds, sample_rate);
        self.target = target;
        if samples == 0 {
            self.value = target;
            self.step = 0.0;
            self.remaining = 0;
        } else {
            self.step = (target - self.value) / samples as f32;
            self.remaining = samples;
        }
    }

    /// Current gain, then advance by one sample.
    pub fn next_value(&mut self) -> f32 {
        let current = self.value;
        if self.remaining > 0 {
            self.remaining -= 1;
            self.value = if self.remaining == 0 {
                self.target
            } else {
                self.value + self.step
            };
        }
        current
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.remaining == 0
    }

    /// Settled at zero: nothing more will be heard.
    pub fn is_silent(&self) -> bool {
        self.is_settled() && self.value <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramps_linearly_and_lands_on_target() {
        let mut ramp = GainRamp::new(0.0);
        ramp.ramp_to(1.0, 0.004, 1000);
        let values: Vec<f32> = (0..5).map(|_| ramp.next_value()).collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert!(ramp.is_settled());
    }

    #[test]
    fn new_ramp_starts_from_current_value() {
        let mut ramp = GainRamp::new(0.0);
        ramp.ramp_to(1.0, 0.010, 1000);
        for _ in 0..5 {
            ramp.next_value();
        }
        let midway = ramp.value();
        assert!((midway - 0.5).abs() < 1e-6);

        ramp.ramp_to(0.0, 0.005, 1000);
        assert_eq!(ramp.target(), 0.0);
        assert!((ramp.next_value() - midway).abs() < 1e-6);
        for _ in 0..4 {
            ramp.next_value();
        }
        assert!(ramp.is_silent());
    }

    #[test]
    fn zero_length_ramp_jumps() {
        let mut ramp = GainRamp::new(0.8);
        ramp.ramp_to(0.0, 0.0, 48_000);
        assert!(ramp.is_silent());
    }
}
