//! # Circular Axis Module
//!
//! Combines the two halves of an analogue stick into one vector and shapes its
//! magnitude with a radial dead/hot zone.
//!
//! Shaping x and y independently produces a square dead zone with "notches"
//! along the axes: a stick pushed slightly off-diagonal snaps onto the nearest
//! axis. Shaping the radius instead preserves direction exactly and only
//! reshapes magnitude.
//!
//! ```
//! use padsense::controller::calibration::Zones;
//! use padsense::controller::circular::CircularAxis;
//!
//! let (x, y) = CircularAxis::compute(0.5, 0.0, Zones::linear());
//! assert!((x - 0.5).abs() < 0.001);
//! assert_eq!(y, 0.0);
//! ```

use super::axis::CentredAxis;
use super::calibration::Zones;

/// Conventional stick pairs and the synthetic name of their combined axis.
pub const STICK_PAIRS: [(&str, &str, &str); 2] = [("l", "lx", "ly"), ("r", "rx", "ry")];

/// Read-only composite of two centred axes.
#[derive(Debug, Clone)]
pub struct CircularAxis {
    sname: String,
    x: String,
    y: String,
    zones: Zones,
}

impl CircularAxis {
    /// Creates a circular axis over the centred axes named `x` and `y`.
    pub fn new(
        sname: impl Into<String>,
        x: impl Into<String>,
        y: impl Into<String>,
        zones: Zones,
    ) -> Self {
        Self {
            sname: sname.into(),
            x: x.into(),
            y: y.into(),
            zones,
        }
    }

    /// Returns the synthetic standard name.
    #[must_use]
    pub fn sname(&self) -> &str {
        &self.sname
    }

    /// Returns the component axis names as `(x, y)`.
    #[must_use]
    pub fn components(&self) -> (&str, &str) {
        (&self.x, &self.y)
    }

    /// Returns the radial zone shaping.
    #[must_use]
    pub fn zones(&self) -> Zones {
        self.zones
    }

    /// Reads the combined vector from the current state of its components.
    #[must_use]
    pub fn read(&self, x: &CentredAxis, y: &CentredAxis) -> (f32, f32) {
        Self::compute(x.normalized(), y.normalized(), self.zones)
    }

    /// Shapes the magnitude of an uncorrected `(x, y)` vector.
    ///
    /// The radius is clamped to 1.0 before shaping; a zero vector stays zero.
    #[must_use]
    pub fn compute(x: f32, y: f32, zones: Zones) -> (f32, f32) {
        let radius = (x * x + y * y).sqrt();
        if radius == 0.0 {
            return (0.0, 0.0);
        }

        let shaped = zones.shape(radius.min(1.0));
        if shaped == 0.0 {
            return (0.0, 0.0);
        }

        let angle = y.atan2(x);
        (shaped * angle.cos(), shaped * angle.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_vector() {
        assert_eq!(CircularAxis::compute(0.0, 0.0, Zones::default()), (0.0, 0.0));
    }

    #[test]
    fn test_linear_passthrough() {
        let (x, y) = CircularAxis::compute(0.5, 0.0, Zones::linear());
        assert!((x - 0.5).abs() < 0.001);
        assert!(y.abs() < 0.001);
    }

    #[test]
    fn test_dead_zone_is_radial() {
        let zones = Zones::new(0.2, 0.0).unwrap();

        // Inside the radial dead zone on the diagonal
        assert_eq!(CircularAxis::compute(0.1, 0.1, zones), (0.0, 0.0));

        // Off-axis input outside the dead zone keeps its small component
        let (x, y) = CircularAxis::compute(0.6, 0.15, zones);
        assert!(y > 0.0, "y component should not be notched away");
        assert!((y / x - 0.25).abs() < 0.001, "direction must be preserved");
    }

    #[test]
    fn test_radius_clamped_to_unit() {
        let (x, y) = CircularAxis::compute(1.0, 1.0, Zones::linear());
        let radius = (x * x + y * y).sqrt();
        assert!((radius - 1.0).abs() < 0.001);
        assert!((x - y).abs() < 0.001);
    }

    #[test]
    fn test_hot_zone_saturates_radius() {
        let zones = Zones::new(0.0, 0.1).unwrap();
        let (x, y) = CircularAxis::compute(0.0, -0.95, zones);
        assert!(x.abs() < 0.001);
        assert!((y + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_read_from_components() {
        let mut lx = CentredAxis::new("lx", 0, -100, 100, Zones::default()).unwrap();
        let mut ly = CentredAxis::new("ly", 1, -100, 100, Zones::default()).unwrap();
        lx.update(-100);
        ly.update(100);
        ly.update(0);

        let circular = CircularAxis::new("l", "lx", "ly", Zones::linear());
        let (x, y) = circular.read(&lx, &ly);
        assert!((x + 1.0).abs() < 0.001);
        assert!(y.abs() < 0.001);
        assert_eq!(circular.components(), ("lx", "ly"));
    }
}
