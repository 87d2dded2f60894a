//! # Linear Parameter Smoother
//!
//! When a knob jumps from 100 ms to 900 ms, jumping the read head with it
//! produces a click. The smoother turns every change into a straight-line
//! ramp of fixed duration instead:
//!
//! ```text
//! value
//!   900 ┤                 ┌──────────
//!       │               ╱
//!       │             ╱      ramp_len samples
//!       │           ╱
//!   100 ┤──────────┘
//!       └──────────┴──────┴────────── samples
//!               set_target   reached
//! ```
//!
//! The per-sample increment is `(target - current) / ramp_len`. Each value
//! is computed as `target - step * steps_left` rather than accumulated, so
//! after `ramp_len` calls to
//! [`next()`](LinearSmoother::next) the value *is* the target, with no
//! floating-point residue and no overshoot.

/// A linear ramp toward a target value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSmoother {
    current: f32,
    target: f32,
    step: f32,
    steps_left: u32,
    ramp_len: u32,
}

impl Default for LinearSmoother {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl LinearSmoother {
    /// A smoother resting at `value`, with smoothing disabled until
    /// [`set_ramp_length()`](Self::set_ramp_length) is called.
    pub fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            steps_left: 0,
            ramp_len: 0,
        }
    }

    /// Set the ramp duration from a time in milliseconds.
    pub fn set_ramp_time(&mut self, sample_rate: f32, ramp_ms: f32) {
        self.set_ramp_length((ramp_ms * sample_rate / 1000.0).round() as u32);
    }

    /// Set the ramp duration in samples. Zero makes every change instant.
    /// A ramp already in progress finishes at its old rate.
    pub fn set_ramp_length(&mut self, samples: u32) {
        self.ramp_len = samples;
    }

    /// Start ramping toward `target`. Setting the same target again does not
    /// restart the ramp.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }

        self.target = target;
        if self.ramp_len == 0 {
            self.current = target;
            self.steps_left = 0;
        } else {
            self.steps_left = self.ramp_len;
            self.step = (target - self.current) / self.ramp_len as f32;
        }
    }

    /// Jump straight to `value` with no ramp.
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.steps_left = 0;
    }

    /// Advance one sample and return the new value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.steps_left > 0 {
            self.steps_left -= 1;
            // Measured back from the target so rounding can't pile up.
            self.current = self.target - self.step * self.steps_left as f32;
        }
        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_smoothing(&self) -> bool {
        self.steps_left > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaches_target_exactly_after_ramp() {
        let mut smoother = LinearSmoother::new(100.0);
        smoother.set_ramp_length(48);
        smoother.set_target(900.0);

        for _ in 0..47 {
            smoother.next();
        }
        assert!(smoother.is_smoothing());
        assert_eq!(smoother.next(), 900.0);
        assert!(!smoother.is_smoothing());
        assert_eq!(smoother.next(), 900.0);
    }

    #[test]
    fn test_ramp_is_strictly_monotonic_without_overshoot() {
        let mut smoother = LinearSmoother::new(900.0);
        smoother.set_ramp_time(44100.0, 50.0);
        smoother.set_target(100.0);

        let mut previous = smoother.current();
        while smoother.is_smoothing() {
            let value = smoother.next();
            assert!(value < previous, "{value} did not fall below {previous}");
            assert!(value >= 100.0, "overshot to {value}");
            previous = value;
        }
        assert_eq!(previous, 100.0);
    }

    #[test]
    fn test_tiny_ramp_below_float_resolution_lands_without_overshoot() {
        // Each step (~2.3e-5) is smaller than one f32 ulp at 400.
        let mut smoother = LinearSmoother::new(400.0);
        smoother.set_ramp_time(44100.0, 50.0);
        smoother.set_target(400.05);
        let target = smoother.target();

        let mut previous = smoother.current();
        let mut steps = 0;
        while smoother.is_smoothing() {
            let value = smoother.next();
            assert!(value >= previous, "{value} fell below {previous}");
            assert!(value <= target, "overshot to {value}");
            assert!(value >= 400.0);
            previous = value;
            steps += 1;
        }
        assert_eq!(steps, 2205);
        assert_eq!(previous, target);
    }

    #[test]
    fn test_retarget_mid_ramp_starts_from_current_value() {
        let mut smoother = LinearSmoother::new(0.0);
        smoother.set_ramp_length(10);
        smoother.set_target(1.0);
        for _ in 0..5 {
            smoother.next();
        }
        let halfway = smoother.current();
        assert!((halfway - 0.5).abs() < 1e-6);

        smoother.set_target(0.0);
        let first = smoother.next();
        assert!(first < halfway);
        for _ in 0..9 {
            smoother.next();
        }
        assert_eq!(smoother.current(), 0.0);
    }

    #[test]
    fn test_same_target_does_not_restart_ramp() {
        let mut smoother = LinearSmoother::new(0.0);
        smoother.set_ramp_length(4);
        smoother.set_target(1.0);
        smoother.next();
        smoother.next();
        smoother.set_target(1.0);
        smoother.next();

        assert_eq!(smoother.next(), 1.0);
    }

    #[test]
    fn test_zero_length_ramp_is_instant() {
        let mut smoother = LinearSmoother::new(0.0);
        smoother.set_target(0.25);
        assert_eq!(smoother.current(), 0.25);
        assert!(!smoother.is_smoothing());
    }

    #[test]
    fn test_reset_snaps() {
        let mut smoother = LinearSmoother::new(0.0);
        smoother.set_ramp_length(100);
        smoother.set_target(1.0);
        smoother.reset(0.5);

        assert_eq!(smoother.next(), 0.5);
        assert_eq!(smoother.target(), 0.5);
    }
}
