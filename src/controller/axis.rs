//! # Axis Module
//!
//! Converts raw, device-specific integer samples into calibrated values.
//!
//! ## Axis Kinds
//!
//! | Kind | Output | Resting value | Example |
//! |------|--------|---------------|---------|
//! | [`CentredAxis`] | -1.0..=1.0 | 0.0 (calibratable centre) | Analogue sticks |
//! | [`TriggerAxis`] | 0.0..=1.0 | 0.0 (fixed end of the range) | L2/R2, LT/RT |
//! | [`BinaryAxis`] | -1.0, 0.0, 1.0 | 0.0 | D-pad hats |
//!
//! ## Auto-ranging
//!
//! Axes start out assuming the hardware reaches only 90% of its nominal
//! travel ([`CALIBRATION_HEADROOM`]). Every sample widens the observed range
//! to include it, so output scale improves over a session and a worn stick
//! that never reaches its nominal extremes still reports full deflection.
//!
//! ```
//! use padsense::controller::axis::CentredAxis;
//! use padsense::controller::calibration::Zones;
//!
//! let mut axis = CentredAxis::new("lx", 0, -255, 255, Zones::linear())?;
//! axis.update(-255);
//! assert!((axis.read() + 1.0).abs() < 0.001);
//! # Ok::<(), padsense::error::PadError>(())
//! ```

use super::calibration::Zones;
use crate::error::{PadError, Result};

/// Proportion of the nominal raw travel assumed reachable before any samples
/// have been observed.
pub const CALIBRATION_HEADROOM: f32 = 0.9;

/// Discriminates the kind of an axis without borrowing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    /// Symmetric axis with a centre, output -1.0 to 1.0.
    Centred,
    /// One-sided axis, output 0.0 to 1.0.
    Trigger,
    /// Hat axis reporting -1/0/1, also exposed as two buttons.
    Binary,
}

/// An analogue control that rests at a centre point and deflects both ways.
#[derive(Debug, Clone)]
pub struct CentredAxis {
    sname: String,
    code: u16,
    /// Nominal raw range from the profile.
    min_raw: f32,
    max_raw: f32,
    /// Centre the axis was constructed with, restored on reset.
    default_centre: f32,
    centre: f32,
    observed_min: f32,
    observed_max: f32,
    value: f32,
    zones: Zones,
    invert: bool,
}

impl CentredAxis {
    /// Creates a centred axis over the nominal raw range `min..=max`, resting at
    /// the midpoint.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Configuration`] if `min >= max`.
    pub fn new(
        sname: impl Into<String>,
        code: u16,
        min: i32,
        max: i32,
        zones: Zones,
    ) -> Result<Self> {
        let sname = sname.into();
        if min >= max {
            return Err(PadError::Configuration(format!(
                "axis '{}': min {} must be below max {}",
                sname, min, max
            )));
        }

        let centre = (min as f32 + max as f32) / 2.0;
        let mut axis = Self {
            sname,
            code,
            min_raw: min as f32,
            max_raw: max as f32,
            default_centre: centre,
            centre,
            observed_min: centre,
            observed_max: centre,
            value: centre,
            zones,
            invert: false,
        };
        axis.reset_range();
        Ok(axis)
    }

    /// Overrides the resting point of the axis.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Configuration`] if the centre lies outside the
    /// nominal raw range.
    pub fn with_centre(mut self, centre: i32) -> Result<Self> {
        let centre = centre as f32;
        if centre < self.min_raw || centre > self.max_raw {
            return Err(PadError::Configuration(format!(
                "axis '{}': centre {} outside range {}..={}",
                self.sname, centre, self.min_raw, self.max_raw
            )));
        }
        self.default_centre = centre;
        self.centre = centre;
        self.value = centre;
        self.reset_range();
        Ok(self)
    }

    /// Marks the axis as inverted, for hardware whose raw sense is reversed
    /// (e.g. stick Y axes that report "up" as a low value).
    #[must_use]
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Returns the standard name of this axis.
    #[must_use]
    pub fn sname(&self) -> &str {
        &self.sname
    }

    /// Returns the raw event code routed to this axis.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Returns the dead/hot zone shaping of this axis.
    #[must_use]
    pub fn zones(&self) -> Zones {
        self.zones
    }

    /// Replaces the dead/hot zone shaping.
    pub fn set_zones(&mut self, zones: Zones) {
        self.zones = zones;
    }

    /// Returns true if the output is negated.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    /// Returns the current centre in raw units.
    #[must_use]
    pub fn centre(&self) -> f32 {
        self.centre
    }

    /// Returns the observed raw range as `(min, max)`.
    #[must_use]
    pub fn observed_range(&self) -> (f32, f32) {
        (self.observed_min, self.observed_max)
    }

    /// Returns the most recent raw sample.
    #[must_use]
    pub fn raw_value(&self) -> f32 {
        self.value
    }

    /// Records a raw sample, widening the observed range to include it.
    pub fn update(&mut self, raw: i32) {
        let raw = raw as f32;
        self.value = raw;
        self.observed_min = self.observed_min.min(raw);
        self.observed_max = self.observed_max.max(raw);
    }

    /// Returns the uncorrected value in -1.0..=1.0, without zone shaping.
    ///
    /// The scale is symmetric about the centre: the wider side of the observed
    /// range defines full deflection, so both directions can reach ±1.0 even
    /// when the raw range is lopsided. Inversion is applied.
    #[must_use]
    pub fn normalized(&self) -> f32 {
        let half_range = (self.observed_max - self.centre).max(self.centre - self.observed_min);
        if half_range <= 0.0 {
            return 0.0;
        }

        let normalized = ((self.value - self.centre) / half_range).clamp(-1.0, 1.0);
        if self.invert {
            -normalized
        } else {
            normalized
        }
    }

    /// Returns the corrected value in -1.0..=1.0 with dead and hot zones applied.
    #[must_use]
    pub fn read(&self) -> f32 {
        self.zones.apply(self.normalized())
    }

    /// Returns true if the corrected value is away from rest.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.read() != 0.0
    }

    /// Moves the centre to a raw value, widening the observed range if needed.
    pub fn set_centre(&mut self, raw: i32) {
        let centre = raw as f32;
        self.centre = centre;
        self.observed_min = self.observed_min.min(centre);
        self.observed_max = self.observed_max.max(centre);
    }

    /// Treats the current raw position as the resting point.
    pub fn centre_on_current(&mut self) {
        self.centre = self.value;
    }

    /// Restores the constructed centre and narrows the observed range back to
    /// its initial assumption (still including the current sample).
    pub fn reset_range(&mut self) {
        self.centre = self.default_centre;
        self.observed_min = self.centre - CALIBRATION_HEADROOM * (self.centre - self.min_raw);
        self.observed_max = self.centre + CALIBRATION_HEADROOM * (self.max_raw - self.centre);
        self.observed_min = self.observed_min.min(self.value);
        self.observed_max = self.observed_max.max(self.value);
    }
}

/// An analogue control that rests at one end of its range, e.g. a trigger.
///
/// Inversion is expressed by constructing with `rest > full`; the output is
/// always 0.0 at rest and 1.0 at full travel.
#[derive(Debug, Clone)]
pub struct TriggerAxis {
    sname: String,
    code: u16,
    rest: f32,
    full: f32,
    observed_full: f32,
    value: f32,
    zones: Zones,
}

impl TriggerAxis {
    /// Creates a trigger axis resting at `rest` and fully pressed at `full`.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Configuration`] if `rest == full`.
    pub fn new(
        sname: impl Into<String>,
        code: u16,
        rest: i32,
        full: i32,
        zones: Zones,
    ) -> Result<Self> {
        let sname = sname.into();
        if rest == full {
            return Err(PadError::Configuration(format!(
                "trigger '{}': rest and full values must differ (both {})",
                sname, rest
            )));
        }

        let mut axis = Self {
            sname,
            code,
            rest: rest as f32,
            full: full as f32,
            observed_full: full as f32,
            value: rest as f32,
            zones,
        };
        axis.reset_range();
        Ok(axis)
    }

    /// Returns the standard name of this axis.
    #[must_use]
    pub fn sname(&self) -> &str {
        &self.sname
    }

    /// Returns the raw event code routed to this axis.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Returns the dead/hot zone shaping of this axis.
    #[must_use]
    pub fn zones(&self) -> Zones {
        self.zones
    }

    /// Replaces the dead/hot zone shaping.
    pub fn set_zones(&mut self, zones: Zones) {
        self.zones = zones;
    }

    /// Returns true if the resting raw value is numerically above full travel.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.rest > self.full
    }

    /// Returns the most recent raw sample.
    #[must_use]
    pub fn raw_value(&self) -> f32 {
        self.value
    }

    /// Returns the observed far end of travel in raw units.
    #[must_use]
    pub fn observed_full(&self) -> f32 {
        self.observed_full
    }

    /// Records a raw sample. Only the far end auto-ranges; samples beyond the
    /// resting end are accepted but read as 0.0.
    pub fn update(&mut self, raw: i32) {
        let raw = raw as f32;
        self.value = raw;

        let span = self.observed_full - self.rest;
        let offset = raw - self.rest;
        if offset.signum() == span.signum() && offset.abs() > span.abs() {
            self.observed_full = raw;
        }
    }

    /// Returns the uncorrected value in 0.0..=1.0, without zone shaping.
    #[must_use]
    pub fn normalized(&self) -> f32 {
        let span = self.observed_full - self.rest;
        if span == 0.0 {
            return 0.0;
        }
        ((self.value - self.rest) / span).clamp(0.0, 1.0)
    }

    /// Returns the corrected value in 0.0..=1.0 with dead and hot zones applied.
    #[must_use]
    pub fn read(&self) -> f32 {
        self.zones.shape(self.normalized())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.read() != 0.0
    }

    /// Narrows the far end back to its initial assumption (still including
    /// the current sample).
    pub fn reset_range(&mut self) {
        self.observed_full = self.rest + CALIBRATION_HEADROOM * (self.full - self.rest);
        let value = self.value;
        self.update(value as i32);
    }
}

/// A hat axis reporting -1, 0 or 1, exposed both as an axis and as a pair of
/// buttons (one per direction).
#[derive(Debug, Clone)]
pub struct BinaryAxis {
    sname: String,
    code: u16,
    negative: String,
    positive: String,
    value: i32,
}

impl BinaryAxis {
    /// Creates a binary axis whose negative and positive directions press the
    /// buttons named `negative` and `positive`.
    pub fn new(
        sname: impl Into<String>,
        code: u16,
        negative: impl Into<String>,
        positive: impl Into<String>,
    ) -> Self {
        Self {
            sname: sname.into(),
            code,
            negative: negative.into(),
            positive: positive.into(),
            value: 0,
        }
    }

    /// Returns the standard name of this axis.
    #[must_use]
    pub fn sname(&self) -> &str {
        &self.sname
    }

    /// Returns the raw event code routed to this axis.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Returns the button names as `(negative, positive)`.
    #[must_use]
    pub fn button_names(&self) -> (&str, &str) {
        (&self.negative, &self.positive)
    }

    /// Records a raw sample and returns the button edges it causes, releases
    /// first, as `(button name, is_down)` pairs.
    pub fn update(&mut self, raw: i32) -> Vec<(String, bool)> {
        let previous = self.value.signum();
        let current = raw.signum();
        self.value = raw;

        let mut edges = Vec::new();
        if previous == current {
            return edges;
        }
        match previous {
            -1 => edges.push((self.negative.clone(), false)),
            1 => edges.push((self.positive.clone(), false)),
            _ => {}
        }
        match current {
            -1 => edges.push((self.negative.clone(), true)),
            1 => edges.push((self.positive.clone(), true)),
            _ => {}
        }
        edges
    }

    /// Returns -1.0, 0.0 or 1.0.
    #[must_use]
    pub fn read(&self) -> f32 {
        self.value.signum() as f32
    }
}

/// Any axis held by a control registry.
#[derive(Debug, Clone)]
pub enum Axis {
    /// Stick-style axis.
    Centred(CentredAxis),
    /// Trigger-style axis.
    Trigger(TriggerAxis),
    /// D-pad hat axis.
    Binary(BinaryAxis),
}

impl Axis {
    /// Returns the standard name.
    #[must_use]
    pub fn sname(&self) -> &str {
        match self {
            Axis::Centred(axis) => axis.sname(),
            Axis::Trigger(axis) => axis.sname(),
            Axis::Binary(axis) => axis.sname(),
        }
    }

    /// Returns the raw event code.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Axis::Centred(axis) => axis.code(),
            Axis::Trigger(axis) => axis.code(),
            Axis::Binary(axis) => axis.code(),
        }
    }

    /// Returns the kind of this axis.
    #[must_use]
    pub fn kind(&self) -> AxisKind {
        match self {
            Axis::Centred(_) => AxisKind::Centred,
            Axis::Trigger(_) => AxisKind::Trigger,
            Axis::Binary(_) => AxisKind::Binary,
        }
    }

    /// Returns the corrected value.
    #[must_use]
    pub fn read(&self) -> f32 {
        match self {
            Axis::Centred(axis) => axis.read(),
            Axis::Trigger(axis) => axis.read(),
            Axis::Binary(axis) => axis.read(),
        }
    }

    /// Returns true if the axis is away from its resting output.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match self {
            Axis::Centred(axis) => axis.is_active(),
            Axis::Trigger(axis) => axis.is_active(),
            Axis::Binary(axis) => axis.read() != 0.0,
        }
    }

    /// Resets auto-ranging calibration. Binary axes have none.
    pub fn reset_range(&mut self) {
        match self {
            Axis::Centred(axis) => axis.reset_range(),
            Axis::Trigger(axis) => axis.reset_range(),
            Axis::Binary(_) => {}
        }
    }
}
