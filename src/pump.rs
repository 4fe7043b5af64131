//! # Event Pump
//!
//! Typed raw-event records and the task that feeds them to a [`Controller`].
//!
//! The device reader only translates and enqueues; a single consumer task
//! drains the channel and is the sole caller of the controller's `feed_*`
//! methods, so events reach the controls in the order the hardware produced
//! them.
//!
//! ```text
//! evdev ──► spawn_reader ──► mpsc::Sender<RawEvent> ──► spawn_consumer ──► Controller
//! ```

use evdev::{InputEvent, InputEventKind};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::controller::facade::Controller;

/// One record from an event source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawEvent {
    /// Absolute axis sample.
    Axis { code: u16, value: i32, timestamp: f64 },
    /// Key edge.
    Button { code: u16, pressed: bool, timestamp: f64 },
    /// The device went away.
    Disconnected,
}

impl RawEvent {
    /// Translates an evdev event.
    ///
    /// Returns `None` for event types the controls do not consume, including
    /// key auto-repeat (value 2) and synchronization reports.
    #[must_use]
    pub fn from_input_event(event: &InputEvent) -> Option<Self> {
        let timestamp = event
            .timestamp()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or_default();

        match event.kind() {
            InputEventKind::AbsAxis(axis) => Some(RawEvent::Axis {
                code: axis.0,
                value: event.value(),
                timestamp,
            }),
            InputEventKind::Key(key) => match event.value() {
                0 | 1 => Some(RawEvent::Button {
                    code: key.code(),
                    pressed: event.value() == 1,
                    timestamp,
                }),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Spawns the consumer task that applies events to `controller`.
///
/// The task ends on [`RawEvent::Disconnected`] or when every sender is
/// dropped; either way the controller is marked disconnected. The join
/// handle yields the number of events applied.
pub fn spawn_consumer(
    controller: Arc<Controller>,
    mut events: mpsc::Receiver<RawEvent>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut applied: u64 = 0;

        while let Some(event) = events.recv().await {
            if event == RawEvent::Disconnected {
                info!("Event source reported disconnect after {} events", applied);
                break;
            }
            controller.apply(event);
            applied += 1;
        }

        debug!("Event consumer stopping");
        controller.set_connected(false);
        applied
    })
}
