//! # Button State Module
//!
//! Tracks digital controls: whether each button is held, when it was pressed,
//! and which buttons were pressed or released since the last check.
//!
//! ## State Machine
//!
//! Each button is either `Released` (initial) or `Held`:
//!
//! | From | Event | To | Effects |
//! |------|-------|----|---------|
//! | Released | down | Held | press time recorded, marked pressed-since-check, handlers fired |
//! | Held | up | Released | press time cleared, marked released-since-check |
//! | Held | down | Held | timestamp bookkeeping only |
//! | Released | up | Released | timestamp bookkeeping only |
//!
//! ## Press History
//!
//! [`ButtonTable::check_and_clear`] swaps the pending pressed/released sets
//! for fresh empty ones and returns them as a [`PressSnapshot`]. A press is
//! never lost between two checks, but several presses of the same button
//! collapse into one entry.
//!
//! ```
//! use padsense::controller::buttons::{Button, ButtonTable};
//!
//! let mut table = ButtonTable::new(vec![Button::new("cross", [304])])?;
//! table.on_event(304, true, 10.0).run();
//! assert_eq!(table.held_duration_at("cross", 12.5)?, Some(2.5));
//!
//! table.on_event(304, false, 12.6).run();
//! assert_eq!(table.held_duration_at("cross", 13.0)?, None);
//!
//! let presses = table.check_and_clear();
//! assert!(presses.was_pressed("cross"));
//! assert!(presses.was_released("cross"));
//! # Ok::<(), padsense::error::PadError>(())
//! ```

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{PadError, Result};

/// Callback invoked on the rising edge of a button.
///
/// Handlers run synchronously on the thread feeding events. They must not
/// block, and should hand work off (e.g. onto a channel) rather than run it
/// inline.
pub type ButtonHandler = dyn Fn(&Button) + Send + Sync;

/// Identity of a single digital control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Button {
    sname: String,
    codes: Vec<u16>,
}

impl Button {
    /// Creates a button with a standard name and the raw codes routed to it.
    ///
    /// Buttons driven only by a binary axis have no codes.
    pub fn new(sname: impl Into<String>, codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            sname: sname.into(),
            codes: codes.into_iter().collect(),
        }
    }

    /// Returns the standard name.
    #[must_use]
    pub fn sname(&self) -> &str {
        &self.sname
    }

    /// Returns the raw codes routed to this button.
    #[must_use]
    pub fn codes(&self) -> &[u16] {
        &self.codes
    }
}

/// Handle returned by handler registration, used to deregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Buttons pressed and released between two checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PressSnapshot {
    pressed: BTreeSet<String>,
    released: BTreeSet<String>,
}

impl PressSnapshot {
    /// Returns true if the named button was pressed during the interval.
    #[must_use]
    pub fn was_pressed(&self, sname: &str) -> bool {
        self.pressed.contains(sname)
    }

    /// Returns true if the named button was released during the interval.
    #[must_use]
    pub fn was_released(&self, sname: &str) -> bool {
        self.released.contains(sname)
    }

    /// Returns true if any button was pressed.
    #[must_use]
    pub fn has_presses(&self) -> bool {
        !self.pressed.is_empty()
    }

    /// Returns true if any button was released.
    #[must_use]
    pub fn has_releases(&self) -> bool {
        !self.released.is_empty()
    }

    /// Iterates pressed button names in name order.
    pub fn pressed(&self) -> impl Iterator<Item = &str> {
        self.pressed.iter().map(String::as_str)
    }

    /// Iterates released button names in name order.
    pub fn released(&self) -> impl Iterator<Item = &str> {
        self.released.iter().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a PressSnapshot {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    /// Iterates the pressed button names.
    fn into_iter(self) -> Self::IntoIter {
        self.pressed.iter()
    }
}

impl fmt::Display for PressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pressed: Vec<&str> = self.pressed().collect();
        let released: Vec<&str> = self.released().collect();
        write!(
            f,
            "pressed=[{}] released=[{}]",
            pressed.join(", "),
            released.join(", ")
        )
    }
}

/// Handlers due to run for the rising edges of one event.
///
/// Returned by [`ButtonTable::on_event`] so the caller can release any lock
/// around the table before running them; handlers then observe already
/// updated button state.
#[must_use = "handlers only run when the dispatch is run"]
#[derive(Default)]
pub struct Dispatch {
    calls: Vec<(Arc<ButtonHandler>, Button)>,
}

impl Dispatch {
    /// Invokes every pending handler in registration order, sequentially.
    pub fn run(self) {
        for (handler, button) in self.calls {
            handler(&button);
        }
    }

    /// Returns the number of pending handler invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Returns true if no handlers are due.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub(crate) fn extend(&mut self, other: Dispatch) {
        self.calls.extend(other.calls);
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.calls.iter().map(|(_, button)| button.sname()))
            .finish()
    }
}

#[derive(Debug)]
struct ButtonState {
    button: Button,
    held: bool,
    press_time: Option<f64>,
    last_event: Option<f64>,
}

struct Registration {
    id: HandlerId,
    buttons: Vec<usize>,
    handler: Arc<ButtonHandler>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("buttons", &self.buttons)
            .finish()
    }
}

/// The full set of buttons for one controller.
///
/// # Thread Safety
///
/// `ButtonTable` is not synchronized on its own; the controller facade guards
/// it together with the axes behind a single lock.
#[derive(Debug)]
pub struct ButtonTable {
    states: Vec<ButtonState>,
    by_code: HashMap<u16, Vec<usize>>,
    by_name: HashMap<String, usize>,
    pending_pressed: BTreeSet<String>,
    pending_released: BTreeSet<String>,
    last_snapshot: Arc<PressSnapshot>,
    registrations: Vec<Registration>,
    next_handler: u64,
}

impl ButtonTable {
    /// Creates a table over the given buttons, all initially released.
    ///
    /// Several buttons may share a raw code, and one button may list several
    /// codes.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::Configuration`] if two buttons share a standard name.
    pub fn new(buttons: Vec<Button>) -> Result<Self> {
        let mut by_code: HashMap<u16, Vec<usize>> = HashMap::new();
        let mut by_name = HashMap::new();

        for (index, button) in buttons.iter().enumerate() {
            if by_name.insert(button.sname.clone(), index).is_some() {
                return Err(PadError::Configuration(format!(
                    "duplicate button name '{}'",
                    button.sname
                )));
            }
            for &code in &button.codes {
                by_code.entry(code).or_default().push(index);
            }
        }

        let states = buttons
            .into_iter()
            .map(|button| ButtonState {
                button,
                held: false,
                press_time: None,
                last_event: None,
            })
            .collect();

        Ok(Self {
            states,
            by_code,
            by_name,
            pending_pressed: BTreeSet::new(),
            pending_released: BTreeSet::new(),
            last_snapshot: Arc::new(PressSnapshot::default()),
            registrations: Vec::new(),
            next_handler: 0,
        })
    }

    /// Applies a raw button edge to every button mapped to `code`.
    ///
    /// Unknown codes are dropped with a debug log; they are expected on
    /// hardware whose profile is incomplete.
    pub fn on_event(&mut self, code: u16, is_down: bool, timestamp: f64) -> Dispatch {
        let mut dispatch = Dispatch::default();

        let Some(indices) = self.by_code.get(&code).cloned() else {
            debug!("Dropping event for unmapped button code {}", code);
            return dispatch;
        };

        for index in indices {
            self.transition(index, is_down, timestamp, &mut dispatch);
        }
        dispatch
    }

    /// Applies an edge to a button by standard name (used for buttons driven
    /// by binary axes).
    ///
    /// # Errors
    ///
    /// Returns [`PadError::UnknownControl`] if no button has this name.
    pub fn set_state(&mut self, sname: &str, is_down: bool, timestamp: f64) -> Result<Dispatch> {
        let index = self.index_of(sname)?;
        let mut dispatch = Dispatch::default();
        self.transition(index, is_down, timestamp, &mut dispatch);
        Ok(dispatch)
    }

    fn transition(&mut self, index: usize, is_down: bool, timestamp: f64, dispatch: &mut Dispatch) {
        let state = &mut self.states[index];
        state.last_event = Some(timestamp);

        match (state.held, is_down) {
            (false, true) => {
                state.held = true;
                state.press_time = Some(timestamp);
                self.pending_pressed.insert(state.button.sname.clone());
                trace!("Button '{}' pressed at {:.3}", state.button.sname, timestamp);

                for registration in &self.registrations {
                    if registration.buttons.contains(&index) {
                        dispatch
                            .calls
                            .push((Arc::clone(&registration.handler), state.button.clone()));
                    }
                }
            }
            (true, false) => {
                state.held = false;
                state.press_time = None;
                self.pending_released.insert(state.button.sname.clone());
                trace!("Button '{}' released at {:.3}", state.button.sname, timestamp);
            }
            _ => {}
        }
    }

    fn index_of(&self, sname: &str) -> Result<usize> {
        self.by_name
            .get(sname)
            .copied()
            .ok_or_else(|| PadError::UnknownControl(sname.to_string()))
    }

    /// Returns how long the named button has been held at time `now`, or
    /// `None` if it is not held.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::UnknownControl`] if no button has this name.
    pub fn held_duration_at(&self, sname: &str, now: f64) -> Result<Option<f64>> {
        let state = &self.states[self.index_of(sname)?];
        Ok(match (state.held, state.press_time) {
            (true, Some(pressed_at)) => Some((now - pressed_at).max(0.0)),
            _ => None,
        })
    }

    /// Returns true if the named button is currently held.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::UnknownControl`] if no button has this name.
    pub fn is_held(&self, sname: &str) -> Result<bool> {
        Ok(self.states[self.index_of(sname)?].held)
    }

    /// Returns the timestamp of the most recent event seen by the named button.
    pub fn last_event_time(&self, sname: &str) -> Result<Option<f64>> {
        Ok(self.states[self.index_of(sname)?].last_event)
    }

    /// Captures and empties the pressed/released-since-check sets.
    ///
    /// The snapshot is also kept as [`ButtonTable::last_snapshot`].
    pub fn check_and_clear(&mut self) -> Arc<PressSnapshot> {
        let snapshot = Arc::new(PressSnapshot {
            pressed: std::mem::take(&mut self.pending_pressed),
            released: std::mem::take(&mut self.pending_released),
        });
        self.last_snapshot = Arc::clone(&snapshot);
        snapshot
    }

    /// Returns the snapshot produced by the most recent check, without
    /// clearing anything.
    #[must_use]
    pub fn last_snapshot(&self) -> Arc<PressSnapshot> {
        Arc::clone(&self.last_snapshot)
    }

    /// Registers a handler for the rising edge of any of the named buttons.
    ///
    /// # Errors
    ///
    /// Returns [`PadError::UnknownControl`] if any name is not a button; no
    /// registration is made in that case.
    pub fn register_handler<F>(&mut self, handler: F, snames: &[&str]) -> Result<HandlerId>
    where
        F: Fn(&Button) + Send + Sync + 'static,
    {
        let buttons = snames
            .iter()
            .map(|sname| self.index_of(sname))
            .collect::<Result<Vec<_>>>()?;

        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        self.registrations.push(Registration {
            id,
            buttons,
            handler: Arc::new(handler),
        });
        Ok(id)
    }

    /// Removes a handler registration. Returns false if it was already gone.
    pub fn deregister_handler(&mut self, id: HandlerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|registration| registration.id != id);
        self.registrations.len() != before
    }

    /// Returns the button with the given standard name.
    #[must_use]
    pub fn button(&self, sname: &str) -> Option<&Button> {
        self.by_name.get(sname).map(|&index| &self.states[index].button)
    }

    /// Returns true if a button has the given standard name.
    #[must_use]
    pub fn contains(&self, sname: &str) -> bool {
        self.by_name.contains_key(sname)
    }

    /// Iterates the standard names of all buttons, in construction order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|state| state.button.sname())
    }

    /// Returns the names of all currently held buttons.
    #[must_use]
    pub fn held_buttons(&self) -> Vec<&str> {
        self.states
            .iter()
            .filter(|state| state.held)
            .map(|state| state.button.sname())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn table() -> ButtonTable {
        ButtonTable::new(vec![
            Button::new("cross", [304]),
            Button::new("circle", [305]),
            Button::new("home", [316, 139]),
        ])
        .unwrap()
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_duplicate_names_rejected() {
        let result = ButtonTable::new(vec![Button::new("a", [1]), Button::new("a", [2])]);
        assert!(matches!(result, Err(PadError::Configuration(_))));
    }

    #[test]
    fn test_initially_released() {
        let table = table();
        assert!(!table.is_held("cross").unwrap());
        assert_eq!(table.held_duration_at("cross", 100.0).unwrap(), None);
        assert!(table.held_buttons().is_empty());
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["cross", "circle", "home"]);
    }

    // ==================== Held Duration Tests ====================

    #[test]
    fn test_hold_duration_reference_example() {
        let mut table = table();
        table.on_event(304, true, 10.0).run();
        let held = table.held_duration_at("cross", 12.5).unwrap().unwrap();
        assert!((held - 2.5).abs() < 1e-9);

        table.on_event(304, false, 12.6).run();
        assert_eq!(table.held_duration_at("cross", 13.0).unwrap(), None);

        let snapshot = table.check_and_clear();
        assert!(snapshot.was_pressed("cross"));
        assert!(snapshot.was_released("cross"));
    }

    #[test]
    fn test_repeated_down_keeps_first_press_time() {
        let mut table = table();
        table.on_event(304, true, 1.0).run();
        table.on_event(304, true, 2.0).run();
        assert_eq!(table.held_duration_at("cross", 3.0).unwrap(), Some(2.0));
        assert_eq!(table.last_event_time("cross").unwrap(), Some(2.0));
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let table = table();
        assert!(matches!(
            table.held_duration_at("square", 0.0),
            Err(PadError::UnknownControl(_))
        ));
    }

    // ==================== Routing Tests ====================

    #[test]
    fn test_unknown_code_is_dropped() {
        let mut table = table();
        let dispatch = table.on_event(999, true, 0.0);
        assert!(dispatch.is_empty());
        assert!(!table.check_and_clear().has_presses());
    }

    #[test]
    fn test_multiple_codes_for_one_name() {
        let mut table = table();
        table.on_event(139, true, 0.0).run();
        assert!(table.is_held("home").unwrap());
        table.on_event(316, false, 1.0).run();
        assert!(!table.is_held("home").unwrap());
    }

    #[test]
    fn test_one_code_for_multiple_names() {
        let mut table = ButtonTable::new(vec![
            Button::new("select", [314]),
            Button::new("share", [314]),
        ])
        .unwrap();
        table.on_event(314, true, 0.0).run();
        assert_eq!(table.held_buttons(), vec!["select", "share"]);
    }

    #[test]
    fn test_set_state_by_name() {
        let mut table = ButtonTable::new(vec![Button::new("dleft", [])]).unwrap();
        table.set_state("dleft", true, 1.0).unwrap().run();
        assert!(table.is_held("dleft").unwrap());
        assert!(table.set_state("dright", true, 1.0).is_err());
    }

    // ==================== Snapshot Tests ====================

    #[test]
    fn test_check_and_clear_empties_sets() {
        let mut table = table();
        table.on_event(304, true, 0.0).run();

        let first = table.check_and_clear();
        assert!(first.was_pressed("cross"));
        assert!(!first.has_releases());

        let second = table.check_and_clear();
        assert!(!second.has_presses());
        assert_eq!(*table.last_snapshot(), *second);
    }

    #[test]
    fn test_presses_between_checks_collapse() {
        let mut table = table();
        for t in 0..3 {
            table.on_event(305, true, t as f64).run();
            table.on_event(305, false, t as f64 + 0.5).run();
        }
        let snapshot = table.check_and_clear();
        assert_eq!(snapshot.pressed().collect::<Vec<_>>(), vec!["circle"]);
        assert_eq!(snapshot.released().collect::<Vec<_>>(), vec!["circle"]);
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let mut table = table();
        table.on_event(304, false, 0.0).run();
        assert!(!table.check_and_clear().has_releases());
    }

    #[test]
    fn test_snapshot_iteration_and_display() {
        let mut table = table();
        table.on_event(305, true, 0.0).run();
        table.on_event(304, true, 0.0).run();
        table.on_event(304, false, 0.1).run();
        let snapshot = table.check_and_clear();

        let names: Vec<&String> = snapshot.into_iter().collect();
        assert_eq!(names, vec!["circle", "cross"]);
        assert_eq!(snapshot.to_string(), "pressed=[circle, cross] released=[cross]");
    }

    // ==================== Handler Tests ====================

    #[test]
    fn test_handler_fires_on_rising_edge_only() {
        let mut table = table();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        table
            .register_handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }, &["cross"])
            .unwrap();

        table.on_event(304, true, 0.0).run();
        table.on_event(304, true, 0.1).run();
        table.on_event(304, false, 0.2).run();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        table.on_event(304, true, 0.3).run();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_handler_receives_button_identity() {
        let mut table = table();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        table
            .register_handler(move |button| {
                sink.lock().unwrap().push(button.sname().to_string());
            }, &["cross", "circle"])
            .unwrap();

        table.on_event(305, true, 0.0).run();
        table.on_event(304, true, 0.0).run();
        assert_eq!(*seen.lock().unwrap(), vec!["circle", "cross"]);
    }

    #[test]
    fn test_multiple_registrations_all_fire() {
        let mut table = table();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = Arc::clone(&count);
            table
                .register_handler(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }, &["circle"])
                .unwrap();
        }
        let dispatch = table.on_event(305, true, 0.0);
        assert_eq!(dispatch.len(), 3);
        dispatch.run();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_deregister_handler() {
        let mut table = table();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let id = table
            .register_handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }, &["cross"])
            .unwrap();

        assert!(table.deregister_handler(id));
        assert!(!table.deregister_handler(id));

        table.on_event(304, true, 0.0).run();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_register_unknown_button_fails() {
        let mut table = table();
        let result = table.register_handler(|_| {}, &["cross", "nope"]);
        assert!(matches!(result, Err(PadError::UnknownControl(_))));
    }
}
