//! # Control Registry
//!
//! Owns every axis and button of one controller and resolves standard names
//! to them.
//!
//! Raw events are routed by code: axis samples to the matching [`Axis`],
//! key edges to the [`ButtonTable`]. Hat axes additionally turn their
//! direction changes into edges on two d-pad buttons.
//!
//! Circular axes are synthesized for every conventional stick pair
//! (`lx`/`ly` → `l`, `rx`/`ry` → `r`) whose halves are both present.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::axis::{Axis, AxisKind, BinaryAxis, CentredAxis, TriggerAxis};
use super::buttons::{Button, ButtonTable, Dispatch, HandlerId, PressSnapshot};
use super::calibration::Zones;
use super::circular::{CircularAxis, STICK_PAIRS};
use crate::error::{PadError, Result};
use crate::profile::ControllerProfile;

/// What a standard name refers to on a particular controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Axis(AxisKind),
    Circular,
    Button,
}

/// The current value of a control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Corrected axis value.
    Axis(f32),
    /// Corrected circular stick vector `(x, y)`.
    Pair(f32, f32),
    /// Seconds a button has been held, or `None` if it is released.
    Held(Option<f64>),
}

impl Value {
    /// Returns the axis value, if this is one.
    #[must_use]
    pub fn as_axis(&self) -> Option<f32> {
        match *self {
            Value::Axis(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the circular vector, if this is one.
    #[must_use]
    pub fn as_pair(&self) -> Option<(f32, f32)> {
        match *self {
            Value::Pair(x, y) => Some((x, y)),
            _ => None,
        }
    }

    /// Returns the held duration of a button value.
    #[must_use]
    pub fn held_duration(&self) -> Option<f64> {
        match *self {
            Value::Held(duration) => duration,
            _ => None,
        }
    }
}

/// The named set of controls for one controller instance.
#[derive(Debug)]
pub struct ControlRegistry {
    profile_name: String,
    axes: Vec<Axis>,
    axis_by_name: HashMap<String, usize>,
    axis_by_code: HashMap<u16, usize>,
    circular: Vec<CircularAxis>,
    buttons: ButtonTable,
}

impl ControlRegistry {
    /// Builds the controls described by a profile.
    ///
    /// `zones` overrides the profile's own dead/hot zones for every analogue
    /// axis when given.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Configuration`] if zones or axis ranges are
    /// invalid, a standard name is used twice, or two axes share a raw code.
    ///
    /// ```
    /// use padsense::controller::registry::{Control, ControlRegistry};
    /// use padsense::profile::find_profile_by_name;
    ///
    /// let profile = find_profile_by_name("DualSense", &[]).unwrap();
    /// let registry = ControlRegistry::from_profile(&profile, None)?;
    /// assert_eq!(registry.resolve("cross")?, Control::Button);
    /// assert_eq!(registry.resolve("l")?, Control::Circular);
    /// assert!(registry.resolve("paddle1").is_err());
    /// # Ok::<(), padsense::error::PadError>(())
    /// ```
    pub fn from_profile(profile: &ControllerProfile, zones: Option<Zones>) -> Result<Self> {
        let zones = match zones {
            Some(zones) => zones,
            None => profile.zones()?,
        };

        let mut axes = Vec::new();
        for spec in &profile.centred_axes {
            let mut axis = CentredAxis::new(&spec.sname, spec.code, spec.min, spec.max, zones)?
                .inverted(spec.invert);
            if let Some(centre) = spec.centre {
                axis = axis.with_centre(centre)?;
            }
            axes.push(Axis::Centred(axis));
        }
        for spec in &profile.trigger_axes {
            axes.push(Axis::Trigger(TriggerAxis::new(
                &spec.sname,
                spec.code,
                spec.rest,
                spec.full,
                zones,
            )?));
        }

        let mut buttons: Vec<Button> = profile
            .buttons
            .iter()
            .map(|spec| Button::new(&spec.sname, spec.codes.iter().copied()))
            .collect();
        for spec in &profile.binary_axes {
            axes.push(Axis::Binary(BinaryAxis::new(
                &spec.sname,
                spec.code,
                &spec.negative,
                &spec.positive,
            )));
            buttons.push(Button::new(&spec.negative, []));
            buttons.push(Button::new(&spec.positive, []));
        }

        let mut registry = Self {
            profile_name: profile.name.clone(),
            axes: Vec::new(),
            axis_by_name: HashMap::new(),
            axis_by_code: HashMap::new(),
            circular: Vec::new(),
            buttons: ButtonTable::new(buttons)?,
        };
        for axis in axes {
            registry.add_axis(axis)?;
        }

        for (sname, x, y) in STICK_PAIRS {
            let Some(x_zones) = registry.centred(x).map(CentredAxis::zones) else {
                continue;
            };
            if registry.centred(y).is_none() {
                continue;
            }
            registry.ensure_name_free(sname)?;
            registry
                .circular
                .push(CircularAxis::new(sname, x, y, x_zones));
        }

        debug!(
            "Built controls for '{}': {} axes, {} buttons, {} circular",
            registry.profile_name,
            registry.axes.len(),
            registry.buttons.names().count(),
            registry.circular.len()
        );
        Ok(registry)
    }

    fn ensure_name_free(&self, sname: &str) -> Result<()> {
        if self.axis_by_name.contains_key(sname)
            || self.buttons.contains(sname)
            || self.circular.iter().any(|c| c.sname() == sname)
        {
            return Err(PadError::Configuration(format!(
                "standard name '{}' is used by more than one control",
                sname
            )));
        }
        Ok(())
    }

    fn add_axis(&mut self, axis: Axis) -> Result<()> {
        self.ensure_name_free(axis.sname())?;
        if let Some(&existing) = self.axis_by_code.get(&axis.code()) {
            return Err(PadError::Configuration(format!(
                "axes '{}' and '{}' share raw code {}",
                self.axes[existing].sname(),
                axis.sname(),
                axis.code()
            )));
        }

        let index = self.axes.len();
        self.axis_by_name.insert(axis.sname().to_string(), index);
        self.axis_by_code.insert(axis.code(), index);
        self.axes.push(axis);
        Ok(())
    }

    fn centred(&self, sname: &str) -> Option<&CentredAxis> {
        match self.axis(sname) {
            Some(Axis::Centred(axis)) => Some(axis),
            _ => None,
        }
    }

    /// Returns the name of the profile these controls were built from.
    #[must_use]
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    /// Returns the axis with the given standard name.
    #[must_use]
    pub fn axis(&self, sname: &str) -> Option<&Axis> {
        self.axis_by_name.get(sname).map(|&index| &self.axes[index])
    }

    /// Returns the button table.
    #[must_use]
    pub fn buttons(&self) -> &ButtonTable {
        &self.buttons
    }

    /// Determines what kind of control a standard name refers to.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::UnknownControl`] if this controller has no such
    /// control.
    pub fn resolve(&self, sname: &str) -> Result<Control> {
        if let Some(axis) = self.axis(sname) {
            return Ok(Control::Axis(axis.kind()));
        }
        if self.circular.iter().any(|c| c.sname() == sname) {
            return Ok(Control::Circular);
        }
        if self.buttons.contains(sname) {
            return Ok(Control::Button);
        }
        Err(PadError::UnknownControl(sname.to_string()))
    }

    /// Returns true if every named control exists.
    #[must_use]
    pub fn has_controls(&self, snames: &[&str]) -> bool {
        snames.iter().all(|sname| self.resolve(sname).is_ok())
    }

    /// Reads one control. Buttons report their held duration at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::UnknownControl`] if this controller has no such
    /// control.
    pub fn read(&self, sname: &str, now: f64) -> Result<Value> {
        if let Some(axis) = self.axis(sname) {
            return Ok(Value::Axis(axis.read()));
        }
        if let Some(circular) = self.circular.iter().find(|c| c.sname() == sname) {
            let (x, y) = circular.components();
            return match (self.centred(x), self.centred(y)) {
                (Some(x), Some(y)) => {
                    let (x, y) = circular.read(x, y);
                    Ok(Value::Pair(x, y))
                }
                _ => Err(PadError::UnknownControl(sname.to_string())),
            };
        }
        Ok(Value::Held(self.buttons.held_duration_at(sname, now)?))
    }

    /// Reads several controls of any kind, preserving order.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown name.
    pub fn read_many(&self, snames: &[&str], now: f64) -> Result<Vec<Value>> {
        snames.iter().map(|sname| self.read(sname, now)).collect()
    }

    /// Routes a raw axis sample. Unknown codes are dropped.
    pub fn feed_axis(&mut self, code: u16, value: i32, timestamp: f64) -> Dispatch {
        let mut dispatch = Dispatch::default();

        let Some(&index) = self.axis_by_code.get(&code) else {
            debug!("Dropping sample for unmapped axis code {}", code);
            return dispatch;
        };

        match &mut self.axes[index] {
            Axis::Centred(axis) => axis.update(value),
            Axis::Trigger(axis) => axis.update(value),
            Axis::Binary(axis) => {
                for (sname, is_down) in axis.update(value) {
                    match self.buttons.set_state(&sname, is_down, timestamp) {
                        Ok(more) => dispatch.extend(more),
                        Err(e) => warn!("Hat axis button '{}' missing: {}", sname, e),
                    }
                }
            }
        }
        dispatch
    }

    /// Routes a raw key edge. Unknown codes are dropped.
    pub fn feed_button(&mut self, code: u16, pressed: bool, timestamp: f64) -> Dispatch {
        self.buttons.on_event(code, pressed, timestamp)
    }

    /// See [`ButtonTable::check_and_clear`].
    pub fn check_and_clear(&mut self) -> Arc<PressSnapshot> {
        self.buttons.check_and_clear()
    }

    /// See [`ButtonTable::last_snapshot`].
    #[must_use]
    pub fn last_snapshot(&self) -> Arc<PressSnapshot> {
        self.buttons.last_snapshot()
    }

    /// See [`ButtonTable::register_handler`].
    pub fn register_handler<F>(&mut self, handler: F, snames: &[&str]) -> Result<HandlerId>
    where
        F: Fn(&Button) + Send + Sync + 'static,
    {
        self.buttons.register_handler(handler, snames)
    }

    /// See [`ButtonTable::deregister_handler`].
    pub fn deregister_handler(&mut self, id: HandlerId) -> bool {
        self.buttons.deregister_handler(id)
    }

    /// Takes the current position of every stick as its new centre.
    ///
    /// Call while the sticks are at rest to correct drift.
    pub fn set_axis_centres(&mut self) {
        for axis in &mut self.axes {
            if let Axis::Centred(axis) = axis {
                axis.centre_on_current();
            }
        }
    }

    /// Discards auto-ranging on every axis.
    pub fn reset_axis_calibration(&mut self) {
        for axis in &mut self.axes {
            axis.reset_range();
        }
    }

    /// Returns the name and corrected value of every axis away from rest.
    #[must_use]
    pub fn active_axes(&self) -> Vec<(&str, f32)> {
        self.axes
            .iter()
            .filter(|axis| axis.is_active())
            .map(|axis| (axis.sname(), axis.read()))
            .collect()
    }

    /// Iterates axis names, circular axes last.
    pub fn axis_names(&self) -> impl Iterator<Item = &str> {
        self.axes
            .iter()
            .map(Axis::sname)
            .chain(self.circular.iter().map(CircularAxis::sname))
    }

    /// Iterates button names.
    pub fn button_names(&self) -> impl Iterator<Item = &str> {
        self.buttons.names()
    }
}
