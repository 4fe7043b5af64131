//! # Calibration Module
//!
//! Applies dead zones and hot zones to normalized controller inputs.
//!
//! ## Dead Zone
//!
//! A dead zone eliminates small movements near the resting position to
//! prevent drift. Magnitudes below the dead zone are mapped to 0.0.
//!
//! ## Hot Zone
//!
//! A hot zone saturates the far end of travel, so a control that never quite
//! reaches its physical extreme still reports full deflection. Magnitudes
//! above `1.0 - hot_zone` are mapped to 1.0.
//!
//! Between the two zones the magnitude is rescaled linearly:
//!
//! `output = (|input| - dead_zone) / (1.0 - dead_zone - hot_zone)`
//!
//! ## Usage
//!
//! ```
//! use padsense::controller::calibration::Zones;
//!
//! let zones = Zones::new(0.1, 0.1)?;
//!
//! // Input near centre (within dead zone)
//! assert_eq!(zones.apply(0.05), 0.0);
//!
//! // Input inside the hot zone
//! assert_eq!(zones.apply(-0.95), -1.0);
//! # Ok::<(), padsense::error::PadError>(())
//! ```

use crate::error::{PadError, Result};

/// Default dead zone applied when a profile does not specify one.
pub const DEFAULT_DEAD_ZONE: f32 = 0.05;

/// Default hot zone applied when a profile does not specify one.
pub const DEFAULT_HOT_ZONE: f32 = 0.0;

/// Dead-zone and hot-zone proportions for one control.
///
/// Both proportions are in `[0, 1)` and their sum never exceeds 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zones {
    dead_zone: f32,
    hot_zone: f32,
}

impl Default for Zones {
    fn default() -> Self {
        Self {
            dead_zone: DEFAULT_DEAD_ZONE,
            hot_zone: DEFAULT_HOT_ZONE,
        }
    }
}

impl Zones {
    /// Creates zone shaping with the given proportions.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Configuration`] if either proportion is not finite,
    /// lies outside `[0, 1)`, or if `dead_zone + hot_zone > 1.0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use padsense::controller::calibration::Zones;
    ///
    /// assert!(Zones::new(0.05, 0.05).is_ok());
    /// assert!(Zones::new(0.6, 0.6).is_err());
    /// ```
    pub fn new(dead_zone: f32, hot_zone: f32) -> Result<Self> {
        for (name, value) in [("dead_zone", dead_zone), ("hot_zone", hot_zone)] {
            if !value.is_finite() || !(0.0..1.0).contains(&value) {
                return Err(PadError::Configuration(format!(
                    "{} must be in [0.0, 1.0), got {}",
                    name, value
                )));
            }
        }

        if dead_zone + hot_zone > 1.0 {
            return Err(PadError::Configuration(format!(
                "dead_zone + hot_zone must not exceed 1.0, got {} + {}",
                dead_zone, hot_zone
            )));
        }

        Ok(Self {
            dead_zone,
            hot_zone,
        })
    }

    /// Creates linear shaping (no dead zone, no hot zone).
    ///
    /// # Examples
    ///
    /// ```
    /// use padsense::controller::calibration::Zones;
    ///
    /// let zones = Zones::linear();
    /// assert!((zones.apply(0.5) - 0.5).abs() < 0.001);
    /// ```
    #[must_use]
    pub fn linear() -> Self {
        Self {
            dead_zone: 0.0,
            hot_zone: 0.0,
        }
    }

    /// Returns the configured dead zone proportion.
    #[must_use]
    pub fn dead_zone(&self) -> f32 {
        self.dead_zone
    }

    /// Returns the configured hot zone proportion.
    #[must_use]
    pub fn hot_zone(&self) -> f32 {
        self.hot_zone
    }

    /// Returns a copy with the dead zone replaced, re-validating the pair.
    pub fn with_dead_zone(self, dead_zone: f32) -> Result<Self> {
        Self::new(dead_zone, self.hot_zone)
    }

    /// Returns a copy with the hot zone replaced, re-validating the pair.
    pub fn with_hot_zone(self, hot_zone: f32) -> Result<Self> {
        Self::new(self.dead_zone, hot_zone)
    }

    /// Applies zone shaping to a signed, normalized input (-1.0 to 1.0).
    ///
    /// The sign of the input is preserved; inputs outside the unit range are
    /// clamped first.
    #[must_use]
    pub fn apply(&self, input: f32) -> f32 {
        let shaped = self.shape(input.abs());
        if shaped == 0.0 {
            0.0
        } else {
            input.signum() * shaped
        }
    }

    /// Applies zone shaping to a magnitude, returning a value in 0.0..=1.0.
    #[must_use]
    pub fn shape(&self, magnitude: f32) -> f32 {
        let magnitude = magnitude.clamp(0.0, 1.0);

        if magnitude < self.dead_zone {
            return 0.0;
        }
        if magnitude > 1.0 - self.hot_zone {
            return 1.0;
        }

        // Empty linear band when the zones meet
        let band = 1.0 - self.dead_zone - self.hot_zone;
        if band <= f32::EPSILON {
            return if magnitude > self.dead_zone { 1.0 } else { 0.0 };
        }

        ((magnitude - self.dead_zone) / band).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Construction Tests ====================

    #[test]
    fn test_zones_new() {
        let zones = Zones::new(0.05, 0.1).unwrap();
        assert!((zones.dead_zone() - 0.05).abs() < 0.001);
        assert!((zones.hot_zone() - 0.1).abs() < 0.001);
    }

    #[test]
    fn test_zones_default() {
        let zones = Zones::default();
        assert!((zones.dead_zone() - 0.05).abs() < 0.001);
        assert_eq!(zones.hot_zone(), 0.0);
    }

    #[test]
    fn test_zones_linear() {
        let zones = Zones::linear();
        assert_eq!(zones.dead_zone(), 0.0);
        assert_eq!(zones.hot_zone(), 0.0);
    }

    #[test]
    fn test_zones_reject_sum_above_one() {
        let result = Zones::new(0.6, 0.5);
        assert!(matches!(result, Err(PadError::Configuration(_))));
    }

    #[test]
    fn test_zones_reject_out_of_range() {
        assert!(Zones::new(-0.1, 0.0).is_err());
        assert!(Zones::new(0.0, 1.0).is_err());
        assert!(Zones::new(f32::NAN, 0.0).is_err());
    }

    #[test]
    fn test_zones_accept_sum_of_exactly_one() {
        let zones = Zones::new(0.5, 0.5).unwrap();
        assert_eq!(zones.shape(0.4), 0.0);
        assert_eq!(zones.shape(0.6), 1.0);
        assert!(zones.shape(0.5).is_finite());
    }

    #[test]
    fn test_with_dead_zone_revalidates() {
        let zones = Zones::new(0.1, 0.5).unwrap();
        assert!(zones.with_dead_zone(0.6).is_err());
        assert!(zones.with_hot_zone(0.2).is_ok());
    }

    // ==================== Dead Zone Tests ====================

    #[test]
    fn test_dead_zone_within_zone() {
        let zones = Zones::new(0.1, 0.0).unwrap();
        assert_eq!(zones.apply(0.05), 0.0);
        assert_eq!(zones.apply(-0.05), 0.0);
        assert_eq!(zones.apply(0.0), 0.0);
    }

    #[test]
    fn test_dead_zone_scaling() {
        let zones = Zones::new(0.1, 0.0).unwrap();

        // Halfway between dead zone edge and max
        assert!((zones.apply(0.55) - 0.5).abs() < 0.01);
        assert!((zones.apply(-0.55) + 0.5).abs() < 0.01);
        assert!((zones.apply(1.0) - 1.0).abs() < 0.001);
    }

    // ==================== Hot Zone Tests ====================

    #[test]
    fn test_hot_zone_saturates() {
        let zones = Zones::new(0.0, 0.2).unwrap();
        assert_eq!(zones.apply(0.85), 1.0);
        assert_eq!(zones.apply(-0.85), -1.0);
        assert!((zones.apply(0.4) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_combined_zones() {
        let zones = Zones::new(0.1, 0.1).unwrap();
        let expected = (140.0 / 255.0 - 0.1) / 0.8;
        assert!((zones.apply(-140.0 / 255.0) + expected).abs() < 0.001);
    }

    #[test]
    fn test_shape_clamps_input() {
        let zones = Zones::linear();
        assert_eq!(zones.shape(1.5), 1.0);
        assert_eq!(zones.shape(-0.5), 0.0);
    }

    #[test]
    fn test_shape_is_monotonic() {
        let zones = Zones::new(0.05, 0.05).unwrap();
        let mut last = 0.0;
        for step in 0..=100 {
            let value = zones.shape(step as f32 / 100.0);
            assert!(value >= last, "shape decreased at step {}", step);
            last = value;
        }
    }
}
