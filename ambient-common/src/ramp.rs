//! Linear parameter ramps
//!
//! Every change to a live audio parameter (gain, filter cutoff) is expressed
//! as a linear ramp from the value the parameter holds *now* to a target over
//! a fixed window. Instantaneous jumps cause audible clicks, so a zero-length
//! ramp is only used for parameters that are not yet audible.
//!
//! Progress is normalized the same way as a fade curve:
//! - position: 0.0 (ramp start) to 1.0 (ramp end), clamped
//! - value: `from + (to - from) × position`

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A scheduled linear interpolation of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    /// Value at the start of the ramp
    pub from: f32,

    /// Value at the end of the ramp (held afterwards)
    pub to: f32,

    /// Ramp length
    pub duration: Duration,
}

impl Ramp {
    /// Create a ramp from `from` to `to` over `duration`
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self { from, to, duration }
    }

    /// A ramp that already sits at `value`
    pub fn hold(value: f32) -> Self {
        Self::new(value, value, Duration::ZERO)
    }

    /// Normalized progress (0.0 to 1.0) after `elapsed`
    pub fn progress(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0) as f32
    }

    /// Parameter value after `elapsed` since the ramp started
    pub fn value_at(&self, elapsed: Duration) -> f32 {
        let t = self.progress(elapsed);
        self.from + (self.to - self.from) * t
    }
}

impl Default for Ramp {
    fn default() -> Self {
        Ramp::hold(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_midpoint() {
        let ramp = Ramp::new(0.0, 0.8, Duration::from_millis(500));
        assert!((ramp.value_at(Duration::from_millis(250)) - 0.4).abs() < 0.001);
    }

    #[test]
    fn test_bounds() {
        let ramp = Ramp::new(1.0, 0.0, Duration::from_millis(300));
        assert_eq!(ramp.value_at(Duration::ZERO), 1.0);
        assert_eq!(ramp.value_at(Duration::from_millis(300)), 0.0);
        // Held after completion
        assert_eq!(ramp.value_at(Duration::from_secs(10)), 0.0);
    }

    #[test]
    fn test_zero_length_ramp_is_immediate() {
        let ramp = Ramp::new(0.2, 0.9, Duration::ZERO);
        assert_eq!(ramp.value_at(Duration::ZERO), 0.9);
        assert_eq!(ramp.progress(Duration::ZERO), 1.0);
    }

    #[test]
    fn test_hold() {
        let ramp = Ramp::hold(0.5);
        assert_eq!(ramp.value_at(Duration::from_secs(1)), 0.5);
    }
}
