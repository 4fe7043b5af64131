//! # Controller Facade
//!
//! Thread-safe handle over one controller's controls.
//!
//! ## Concurrency
//!
//! One producer (the event pump) feeds raw events while any number of
//! readers query values from other threads or tasks. All control state sits
//! behind a single [`Mutex`], so:
//!
//! - an axis read never observes a half-applied sample
//! - [`Controller::check_and_clear`] is atomic with respect to
//!   [`Controller::feed_button`]; no press is lost or counted twice
//!
//! Button handlers run after the lock is released but before `feed_button`
//! returns. They see the already-updated state and may read the controller,
//! but they must not block: the producer is stalled while they run.
//!
//! ```
//! use padsense::controller::facade::{Controller, ManualClock};
//! use padsense::profile::find_profile_by_name;
//! use std::sync::Arc;
//!
//! let profile = find_profile_by_name("DualShock 4", &[]).unwrap();
//! let clock = Arc::new(ManualClock::new(10.0));
//! let controller = Controller::with_clock(&profile, None, clock.clone())?;
//!
//! controller.feed_button(305, true, 10.0);
//! clock.set(12.5);
//! assert_eq!(controller.held_duration("cross")?, Some(2.5));
//! # Ok::<(), padsense::error::PadError>(())
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use super::buttons::{Button, HandlerId, PressSnapshot};
use super::calibration::Zones;
use super::registry::{Control, ControlRegistry, Value};
use crate::error::Result;
use crate::profile::ControllerProfile;
use crate::pump::RawEvent;

/// Source of "now" for held durations, in seconds since the UNIX epoch.
///
/// Must share a time base with the timestamps of fed events.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock, matching the time base of evdev event timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        let now = chrono::Utc::now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
    }
}

/// Externally driven clock for replaying recorded sessions.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    pub fn set(&self, now: f64) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// A connected (or formerly connected) game controller.
pub struct Controller {
    registry: Mutex<ControlRegistry>,
    connected: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("registry", &self.registry)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Builds a controller from a profile using the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PadError::Configuration`] if the profile or zones are invalid.
    pub fn new(profile: &ControllerProfile, zones: Option<Zones>) -> Result<Self> {
        Self::with_clock(profile, zones, Arc::new(SystemClock))
    }

    /// Builds a controller from a profile with an explicit clock.
    pub fn with_clock(
        profile: &ControllerProfile,
        zones: Option<Zones>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self::from_registry(
            ControlRegistry::from_profile(profile, zones)?,
            clock,
        ))
    }

    /// Wraps an already built registry. The controller starts connected.
    #[must_use]
    pub fn from_registry(registry: ControlRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Mutex::new(registry),
            connected: AtomicBool::new(true),
            clock,
        }
    }

    // Every mutation leaves the registry consistent, so a poisoned lock is
    // still safe to use.
    fn lock(&self) -> MutexGuard<'_, ControlRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the name of the profile this controller was built from.
    #[must_use]
    pub fn profile_name(&self) -> String {
        self.lock().profile_name().to_string()
    }

    /// Applies a raw axis sample.
    pub fn feed_axis(&self, code: u16, value: i32, timestamp: f64) {
        let dispatch = self.lock().feed_axis(code, value, timestamp);
        dispatch.run();
    }

    /// Applies a raw key edge, running any rising-edge handlers before
    /// returning.
    pub fn feed_button(&self, code: u16, pressed: bool, timestamp: f64) {
        let dispatch = self.lock().feed_button(code, pressed, timestamp);
        dispatch.run();
    }

    /// Applies one record from the event pump.
    pub fn apply(&self, event: RawEvent) {
        match event {
            RawEvent::Axis {
                code,
                value,
                timestamp,
            } => self.feed_axis(code, value, timestamp),
            RawEvent::Button {
                code,
                pressed,
                timestamp,
            } => self.feed_button(code, pressed, timestamp),
            RawEvent::Disconnected => self.set_connected(false),
        }
    }

    /// Determines what kind of control a standard name refers to.
    pub fn resolve(&self, sname: &str) -> Result<Control> {
        self.lock().resolve(sname)
    }

    /// Returns true if every named control exists on this controller.
    #[must_use]
    pub fn has_controls(&self, snames: &[&str]) -> bool {
        self.lock().has_controls(snames)
    }

    /// Reads one control by standard name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PadError::UnknownControl`] if the controller has
    /// no such control.
    pub fn read(&self, sname: &str) -> Result<Value> {
        let now = self.clock.now();
        self.lock().read(sname, now)
    }

    /// Reads several controls under one lock, so the values are mutually
    /// consistent.
    pub fn read_many(&self, snames: &[&str]) -> Result<Vec<Value>> {
        let now = self.clock.now();
        self.lock().read_many(snames, now)
    }

    /// Returns how long the named button has been held, or `None` if it is
    /// released.
    pub fn held_duration(&self, sname: &str) -> Result<Option<f64>> {
        let now = self.clock.now();
        self.lock().buttons().held_duration_at(sname, now)
    }

    /// Returns buttons pressed and released since the previous call.
    pub fn check_and_clear(&self) -> Arc<PressSnapshot> {
        self.lock().check_and_clear()
    }

    /// Returns the snapshot from the most recent [`Controller::check_and_clear`].
    #[must_use]
    pub fn last_presses(&self) -> Arc<PressSnapshot> {
        self.lock().last_snapshot()
    }

    /// Registers a handler for rising edges of the named buttons.
    pub fn register_handler<F>(&self, handler: F, snames: &[&str]) -> Result<HandlerId>
    where
        F: Fn(&Button) + Send + Sync + 'static,
    {
        self.lock().register_handler(handler, snames)
    }

    /// Removes a handler registration.
    pub fn deregister_handler(&self, id: HandlerId) -> bool {
        self.lock().deregister_handler(id)
    }

    /// Returns false once the event source has reported device loss.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Records the connection state, logging transitions.
    pub fn set_connected(&self, connected: bool) {
        let was = self.connected.swap(connected, Ordering::SeqCst);
        match (was, connected) {
            (true, false) => warn!("Controller disconnected"),
            (false, true) => info!("Controller reconnected"),
            _ => {}
        }
    }

    /// Takes the current stick positions as their centres.
    pub fn set_axis_centres(&self) {
        self.lock().set_axis_centres();
    }

    /// Discards auto-ranging on every axis.
    pub fn reset_axis_calibration(&self) {
        self.lock().reset_axis_calibration();
    }

    /// Returns the name and value of every axis away from rest.
    #[must_use]
    pub fn active_axes(&self) -> Vec<(String, f32)> {
        self.lock()
            .active_axes()
            .into_iter()
            .map(|(sname, value)| (sname.to_string(), value))
            .collect()
    }

    #[must_use]
    pub fn axis_names(&self) -> Vec<String> {
        self.lock().axis_names().map(str::to_string).collect()
    }

    #[must_use]
    pub fn button_names(&self) -> Vec<String> {
        self.lock().button_names().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PadError;
    use crate::profile::find_profile_by_name;
    use std::collections::BTreeSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Weak;

    fn controller_with(clock: Arc<dyn Clock>) -> Controller {
        let profile = find_profile_by_name("DualShock 4", &[]).unwrap();
        Controller::with_clock(&profile, None, clock).unwrap()
    }

    // ==================== Clock Tests ====================

    #[test]
    fn test_held_duration_uses_clock() {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(12.5);
        let controller = controller_with(Arc::new(clock));

        controller.feed_button(305, true, 10.0);
        assert_eq!(controller.held_duration("cross").unwrap(), Some(2.5));

        controller.feed_button(305, false, 12.6);
        assert_eq!(controller.held_duration("cross").unwrap(), None);

        let snapshot = controller.check_and_clear();
        assert!(snapshot.was_pressed("cross"));
        assert!(snapshot.was_released("cross"));
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(1.0);
        clock.advance(0.5);
        assert!((clock.now() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_system_clock_is_epoch_seconds() {
        // Any date after 2020-01-01
        assert!(SystemClock.now() > 1_577_836_800.0);
    }

    // ==================== Facade Tests ====================

    #[test]
    fn test_unknown_control_is_recoverable() {
        let controller = controller_with(Arc::new(ManualClock::new(0.0)));
        assert!(matches!(
            controller.read("touchpad"),
            Err(PadError::UnknownControl(_))
        ));
        assert!(controller.read("lx").is_ok());
    }

    #[test]
    fn test_apply_raw_events() {
        let controller = controller_with(Arc::new(ManualClock::new(5.0)));
        controller.apply(RawEvent::Axis {
            code: 3,
            value: 255,
            timestamp: 1.0,
        });
        controller.apply(RawEvent::Button {
            code: 316,
            pressed: true,
            timestamp: 2.0,
        });

        let values = controller.read_many(&["lt", "home"]).unwrap();
        assert_eq!(values[0], Value::Axis(1.0));
        assert_eq!(values[1], Value::Held(Some(3.0)));
        assert!(controller.connected());

        controller.apply(RawEvent::Disconnected);
        assert!(!controller.connected());
    }

    #[test]
    fn test_connected_flag_round_trip() {
        let controller = controller_with(Arc::new(ManualClock::new(0.0)));
        controller.set_connected(false);
        controller.set_connected(false);
        assert!(!controller.connected());
        controller.set_connected(true);
        assert!(controller.connected());
    }

    #[test]
    fn test_last_presses_does_not_clear() {
        let controller = controller_with(Arc::new(ManualClock::new(0.0)));
        controller.feed_button(307, true, 0.0);
        let first = controller.check_and_clear();
        assert!(controller.last_presses().was_pressed("triangle"));
        assert!(Arc::ptr_eq(&first, &controller.last_presses()));
    }

    #[test]
    fn test_handler_can_read_controller() {
        let controller = Arc::new(controller_with(Arc::new(ManualClock::new(4.0))));
        let observed = Arc::new(Mutex::new(None));

        let weak: Weak<Controller> = Arc::downgrade(&controller);
        let sink = Arc::clone(&observed);
        controller
            .register_handler(move |button| {
                if let Some(controller) = weak.upgrade() {
                    *sink.lock().unwrap() = controller.held_duration(button.sname()).unwrap();
                }
            }, &["square"])
            .unwrap();

        controller.feed_button(304, true, 3.0);
        assert_eq!(*observed.lock().unwrap(), Some(1.0));
    }

    #[test]
    fn test_deregistered_handler_not_called() {
        let controller = controller_with(Arc::new(ManualClock::new(0.0)));
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let id = controller
            .register_handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }, &["start"])
            .unwrap();

        controller.feed_button(312, true, 0.0);
        assert!(controller.deregister_handler(id));
        controller.feed_button(312, false, 0.1);
        controller.feed_button(312, true, 0.2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_active_axes_owned() {
        let controller = controller_with(Arc::new(ManualClock::new(0.0)));
        controller.feed_axis(4, 255, 0.0);
        assert_eq!(controller.active_axes(), vec![("rt".to_string(), 1.0)]);
        controller.reset_axis_calibration();
        controller.set_axis_centres();
        assert!(controller.axis_names().contains(&"l".to_string()));
        assert!(controller.button_names().contains(&"home".to_string()));
    }

    // ==================== Concurrency Tests ====================

    #[test]
    fn test_no_press_lost_across_concurrent_checks() {
        let controller = controller_with(Arc::new(ManualClock::new(0.0)));
        let codes: [(u16, &str); 4] = [(304, "square"), (305, "cross"), (306, "circle"), (307, "triangle")];
        let done = AtomicBool::new(false);

        let mut seen = std::thread::scope(|scope| {
            let consumer = scope.spawn(|| {
                let mut seen = BTreeSet::new();
                while !done.load(Ordering::SeqCst) {
                    let snapshot = controller.check_and_clear();
                    seen.extend(snapshot.pressed().map(str::to_string));
                }
                seen
            });

            for round in 0..200 {
                let (code, _) = codes[round % codes.len()];
                let t = round as f64 * 0.01;
                controller.feed_button(code, true, t);
                controller.feed_button(code, false, t + 0.005);
            }
            done.store(true, Ordering::SeqCst);

            consumer.join().unwrap()
        });

        seen.extend(controller.check_and_clear().pressed().map(str::to_string));
        for (_, name) in codes {
            assert!(seen.contains(name), "press of {} was lost", name);
        }
    }

    #[test]
    fn test_axis_reads_bounded_under_concurrent_feed() {
        let controller = controller_with(Arc::new(ManualClock::new(0.0)));
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                while !done.load(Ordering::SeqCst) {
                    let values = controller.read_many(&["lx", "l"]).unwrap();
                    let x = values[0].as_axis().unwrap();
                    assert!((-1.0..=1.0).contains(&x));
                    let (cx, cy) = values[1].as_pair().unwrap();
                    assert!((cx * cx + cy * cy).sqrt() <= 1.0 + 1e-5);
                }
            });

            for raw in (-500..800).step_by(7) {
                controller.feed_axis(0, raw, 0.0);
                controller.feed_axis(1, 255 - raw, 0.0);
            }
            done.store(true, Ordering::SeqCst);
        });
    }
}
