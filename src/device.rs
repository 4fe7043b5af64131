//! # Input Device Module
//!
//! Opens a game controller through the Linux evdev interface and pumps its
//! events into a channel.
//!
//! ## Controller Detection
//!
//! Either an explicit `/dev/input/eventN` path is opened, or every
//! `/dev/input/event*` node is scanned (in path order) for a device whose
//! vendor and product IDs match a known [`ControllerProfile`].
//!
//! A profile can also be forced by name, for hardware that reports IDs no
//! profile lists.

use evdev::Device;
use std::path::Path;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{PadError, Result};
use crate::profile::{find_profile, find_profile_by_name, ControllerProfile};
use crate::pump::RawEvent;

const INPUT_DIR: &str = "/dev/input";

/// An opened controller and the profile describing it.
pub struct EvdevSource {
    device: Device,
    device_path: String,
    profile: ControllerProfile,
}

impl EvdevSource {
    /// Opens the device at `path`.
    ///
    /// # Errors
    ///
    /// - `Io`: the node cannot be opened (missing, permission denied)
    /// - `ControllerNotFound`: no profile matches the device
    pub fn open<P: AsRef<Path>>(
        path: P,
        extra: &[ControllerProfile],
        profile_name: Option<&str>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path)?;
        let id = device.input_id();

        let profile = select_profile(id.vendor(), id.product(), extra, profile_name)
            .ok_or(PadError::ControllerNotFound)?;
        let device_path = path.to_string_lossy().to_string();
        info!("Opened '{}' at {} as {}", device.name().unwrap_or("unnamed"), device_path, profile.name);

        Ok(Self {
            device,
            device_path,
            profile,
        })
    }

    /// Opens the first attached device that matches a profile.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use padsense::device::EvdevSource;
    ///
    /// let source = EvdevSource::scan(&[], None)?;
    /// println!("Connected to {} at {}", source.profile().name, source.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn scan(extra: &[ControllerProfile], profile_name: Option<&str>) -> Result<Self> {
        let input_dir = Path::new(INPUT_DIR);

        if !input_dir.exists() {
            return Err(PadError::Device(format!("{} directory not found", INPUT_DIR)));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| PadError::Device(format!("Failed to read {}: {}", INPUT_DIR, e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PadError::Device(format!("Failed to read directory entry: {}", e)))?;

        // Deterministic choice when several controllers are attached
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_node {
                continue;
            }

            let device = match Device::open(&path) {
                Ok(device) => device,
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                    continue;
                }
            };

            let id = device.input_id();
            debug!(
                "Found input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
                path.display(),
                id.vendor(),
                id.product()
            );

            if let Some(profile) = select_profile(id.vendor(), id.product(), extra, profile_name) {
                let device_path = path.to_string_lossy().to_string();
                info!("Found {} at: {}", profile.name, device_path);
                return Ok(Self {
                    device,
                    device_path,
                    profile,
                });
            }
        }

        Err(PadError::ControllerNotFound)
    }

    /// Returns the `/dev/input/eventN` path that was opened.
    #[must_use]
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Returns the human-readable device name, if it reports one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Returns the profile selected for this device.
    #[must_use]
    pub fn profile(&self) -> &ControllerProfile {
        &self.profile
    }

    /// Takes exclusive access so other readers (e.g. a desktop session) stop
    /// seeing this controller's input.
    pub fn grab(&mut self) -> Result<()> {
        self.device
            .grab()
            .map_err(|e| PadError::Device(format!("Failed to grab {}: {}", self.device_path, e)))
    }

    /// Reads events on a dedicated thread and sends them to `events`.
    ///
    /// Ends after sending [`RawEvent::Disconnected`] when the device fails
    /// (typically unplugged), or silently when the receiver is dropped. The
    /// thread is detached from the async runtime so a reader blocked in
    /// `fetch_events` never holds up shutdown.
    pub fn spawn_reader(mut self, events: mpsc::Sender<RawEvent>) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("evdev-reader".to_string())
            .spawn(move || loop {
                let batch = match self.device.fetch_events() {
                    Ok(batch) => batch,
                    Err(e) => {
                        warn!("Lost {}: {}", self.device_path, e);
                        let _ = events.blocking_send(RawEvent::Disconnected);
                        return;
                    }
                };

                for event in batch {
                    let Some(raw) = RawEvent::from_input_event(&event) else {
                        continue;
                    };
                    if events.blocking_send(raw).is_err() {
                        debug!("Event receiver dropped, stopping reader for {}", self.device_path);
                        return;
                    }
                }
            })?;
        Ok(handle)
    }
}

/// Picks the profile for a device: a forced name wins over ID matching.
fn select_profile(
    vendor_id: u16,
    product_id: u16,
    extra: &[ControllerProfile],
    profile_name: Option<&str>,
) -> Option<ControllerProfile> {
    match profile_name {
        Some(name) => find_profile_by_name(name, extra),
        None => find_profile(vendor_id, product_id, extra),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_profile_by_ids() {
        let profile = select_profile(0x054c, 0x0ce6, &[], None).unwrap();
        assert_eq!(profile.name, "DualSense");
        assert!(select_profile(0x0001, 0x0002, &[], None).is_none());
    }

    #[test]
    fn test_select_profile_forced_name() {
        let profile = select_profile(0x0001, 0x0002, &[], Some("DualShock 4")).unwrap();
        assert_eq!(profile.name, "DualShock 4");
        assert!(select_profile(0x054c, 0x0ce6, &[], Some("missing")).is_none());
    }

    #[test]
    fn test_open_missing_path_is_io_error() {
        let result = EvdevSource::open("/nonexistent/event99", &[], None);
        assert!(matches!(result, Err(PadError::Io(_))));
    }

    // Requires a supported controller attached to the machine
    #[test]
    #[ignore]
    fn test_scan_finds_controller() {
        let source = EvdevSource::scan(&[], None).expect("no supported controller attached");
        assert!(source.device_path().starts_with("/dev/input/event"));
        println!("Found {} ({:?})", source.profile().name, source.name());
    }

    #[tokio::test]
    #[ignore]
    async fn test_reader_delivers_events() {
        let source = EvdevSource::scan(&[], None).expect("no supported controller attached");
        let (tx, mut rx) = mpsc::channel(64);
        let _reader = source.spawn_reader(tx).unwrap();

        println!("Move a stick or press a button...");
        let event = rx.recv().await;
        assert!(event.is_some());
    }
}
