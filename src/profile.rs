//! # Controller Profiles
//!
//! Plain data records describing how a family of controllers maps raw evdev
//! codes onto standard names, plus the table of built-in profiles.
//!
//! Profiles are matched by USB vendor/product ID. User-defined profiles can
//! be supplied through the `[[profiles]]` section of the configuration file
//! and take precedence over the built-ins.
//!
//! ## Standard Names
//!
//! | Name | Control |
//! |------|---------|
//! | `lx`, `ly`, `rx`, `ry` | Left/right stick axes (up and right positive) |
//! | `l`, `r` | Circular left/right stick (synthesized from the pair) |
//! | `lt`, `rt` | Analogue triggers |
//! | `dx`, `dy` | D-pad hat axes |
//! | `dleft`, `dright`, `dup`, `ddown` | D-pad buttons |
//! | `cross`, `circle`, `square`, `triangle` | Face buttons (Xbox A/B/X/Y) |
//! | `l1`, `r1`, `l2`, `r2`, `ls`, `rs` | Shoulder, trigger and stick-click buttons |
//! | `select`, `start`, `home` | System buttons |

use serde::{Deserialize, Serialize};

use crate::controller::calibration::{Zones, DEFAULT_DEAD_ZONE, DEFAULT_HOT_ZONE};
use crate::controller::circular::STICK_PAIRS;
use crate::error::Result;

/// Sony USB vendor ID
pub const SONY_VENDOR_ID: u16 = 0x054c;

/// Microsoft USB vendor ID
pub const MICROSOFT_VENDOR_ID: u16 = 0x045e;

/// A button and the raw key codes routed to it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ButtonSpec {
    pub sname: String,
    pub codes: Vec<u16>,
}

/// A stick-style axis.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CentredAxisSpec {
    pub sname: String,
    pub code: u16,
    pub min: i32,
    pub max: i32,

    /// Resting point; the midpoint of `min..=max` when absent.
    #[serde(default)]
    pub centre: Option<i32>,

    #[serde(default)]
    pub invert: bool,
}

/// A trigger-style axis. `rest > full` describes an inverted trigger.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TriggerAxisSpec {
    pub sname: String,
    pub code: u16,
    pub rest: i32,
    pub full: i32,
}

/// A hat axis and the two buttons its directions press.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BinaryAxisSpec {
    pub sname: String,
    pub code: u16,
    pub negative: String,
    pub positive: String,
}

/// Everything needed to build the controls of one controller family.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ControllerProfile {
    pub name: String,

    #[serde(default)]
    pub vendor_id: u16,

    #[serde(default)]
    pub product_ids: Vec<u16>,

    #[serde(default = "default_dead_zone")]
    pub dead_zone: f32,

    #[serde(default = "default_hot_zone")]
    pub hot_zone: f32,

    #[serde(default)]
    pub buttons: Vec<ButtonSpec>,

    #[serde(default)]
    pub centred_axes: Vec<CentredAxisSpec>,

    #[serde(default)]
    pub trigger_axes: Vec<TriggerAxisSpec>,

    #[serde(default)]
    pub binary_axes: Vec<BinaryAxisSpec>,
}

fn default_dead_zone() -> f32 { DEFAULT_DEAD_ZONE }
fn default_hot_zone() -> f32 { DEFAULT_HOT_ZONE }

impl ControllerProfile {
    /// Returns true if this profile describes the given USB device.
    #[must_use]
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_ids.contains(&product_id)
    }

    /// Returns the profile-wide dead/hot zones.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PadError::Configuration`] if the proportions are invalid.
    pub fn zones(&self) -> Result<Zones> {
        Zones::new(self.dead_zone, self.hot_zone)
    }

    /// Returns every standard name a controller built from this profile
    /// exposes, including synthesized circular axes and d-pad buttons.
    #[must_use]
    pub fn control_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        names.extend(self.buttons.iter().map(|b| b.sname.clone()));
        for hat in &self.binary_axes {
            names.push(hat.sname.clone());
            names.push(hat.negative.clone());
            names.push(hat.positive.clone());
        }
        names.extend(self.centred_axes.iter().map(|a| a.sname.clone()));
        names.extend(self.trigger_axes.iter().map(|a| a.sname.clone()));

        for (sname, x, y) in STICK_PAIRS {
            let has = |n: &str| self.centred_axes.iter().any(|a| a.sname == n);
            if has(x) && has(y) {
                names.push(sname.to_string());
            }
        }
        names
    }

    /// Returns true if the profile provides every one of the named controls.
    ///
    /// Used to pick a controller that satisfies an application's needs, e.g.
    /// "must have two sticks and a home button".
    ///
    /// ```
    /// use padsense::profile::find_profile_by_name;
    ///
    /// let ds4 = find_profile_by_name("DualShock 4", &[]).unwrap();
    /// assert!(ds4.supports(&["l", "r", "home"]));
    /// assert!(!ds4.supports(&["paddle1"]));
    /// ```
    #[must_use]
    pub fn supports(&self, snames: &[&str]) -> bool {
        let names = self.control_names();
        snames.iter().all(|wanted| names.iter().any(|n| n == wanted))
    }
}

/// Returns the first matching profile, preferring user-defined ones.
#[must_use]
pub fn find_profile(
    vendor_id: u16,
    product_id: u16,
    extra: &[ControllerProfile],
) -> Option<ControllerProfile> {
    extra
        .iter()
        .cloned()
        .chain(builtin_profiles())
        .find(|profile| profile.matches(vendor_id, product_id))
}

/// Looks up a profile by name (case-insensitive), preferring user-defined ones.
#[must_use]
pub fn find_profile_by_name(name: &str, extra: &[ControllerProfile]) -> Option<ControllerProfile> {
    extra
        .iter()
        .cloned()
        .chain(builtin_profiles())
        .find(|profile| profile.name.eq_ignore_ascii_case(name))
}

/// Returns the built-in profiles.
#[must_use]
pub fn builtin_profiles() -> Vec<ControllerProfile> {
    vec![dualshock4(), dualsense(), xbox_one_wired(), xbox_one_wireless()]
}

fn buttons(table: &[(&str, u16)]) -> Vec<ButtonSpec> {
    table
        .iter()
        .map(|&(sname, code)| ButtonSpec {
            sname: sname.to_string(),
            codes: vec![code],
        })
        .collect()
}

/// Stick layout shared by every built-in profile: Y axes report "up" as a
/// low value, so they are inverted.
fn sticks(codes: [u16; 4], min: i32, max: i32) -> Vec<CentredAxisSpec> {
    ["lx", "ly", "rx", "ry"]
        .iter()
        .zip(codes)
        .map(|(&sname, code)| CentredAxisSpec {
            sname: sname.to_string(),
            code,
            min,
            max,
            centre: None,
            invert: sname.ends_with('y'),
        })
        .collect()
}

fn triggers(lt: u16, rt: u16, full: i32) -> Vec<TriggerAxisSpec> {
    [("lt", lt), ("rt", rt)]
        .iter()
        .map(|&(sname, code)| TriggerAxisSpec {
            sname: sname.to_string(),
            code,
            rest: 0,
            full,
        })
        .collect()
}

fn dpad() -> Vec<BinaryAxisSpec> {
    vec![
        BinaryAxisSpec {
            sname: "dx".to_string(),
            code: 16,
            negative: "dleft".to_string(),
            positive: "dright".to_string(),
        },
        BinaryAxisSpec {
            sname: "dy".to_string(),
            code: 17,
            negative: "dup".to_string(),
            positive: "ddown".to_string(),
        },
    ]
}

fn dualshock4() -> ControllerProfile {
    ControllerProfile {
        name: "DualShock 4".to_string(),
        vendor_id: SONY_VENDOR_ID,
        product_ids: vec![0x05c4, 0x09cc],
        dead_zone: 0.05,
        hot_zone: 0.05,
        buttons: buttons(&[
            ("square", 304),
            ("cross", 305),
            ("circle", 306),
            ("triangle", 307),
            ("l1", 308),
            ("r1", 309),
            ("l2", 310),
            ("r2", 311),
            ("start", 312),
            ("select", 313),
            ("ls", 314),
            ("rs", 315),
            ("home", 316),
        ]),
        centred_axes: sticks([0, 1, 2, 5], 0, 255),
        trigger_axes: triggers(3, 4, 255),
        binary_axes: dpad(),
    }
}

fn dualsense() -> ControllerProfile {
    ControllerProfile {
        name: "DualSense".to_string(),
        vendor_id: SONY_VENDOR_ID,
        product_ids: vec![0x0ce6],
        dead_zone: 0.05,
        hot_zone: 0.05,
        buttons: buttons(&[
            ("cross", 304),
            ("circle", 305),
            ("triangle", 307),
            ("square", 308),
            ("l1", 310),
            ("r1", 311),
            ("l2", 312),
            ("r2", 313),
            ("select", 314),
            ("start", 315),
            ("home", 316),
            ("ls", 317),
            ("rs", 318),
        ]),
        centred_axes: sticks([0, 1, 3, 4], 0, 255),
        trigger_axes: triggers(2, 5, 255),
        binary_axes: dpad(),
    }
}

fn xbox_one_wired() -> ControllerProfile {
    ControllerProfile {
        name: "Xbox One S (wired)".to_string(),
        vendor_id: MICROSOFT_VENDOR_ID,
        product_ids: vec![0x02ea],
        dead_zone: 0.1,
        hot_zone: 0.05,
        buttons: buttons(&[
            ("cross", 304),
            ("circle", 305),
            ("square", 307),
            ("triangle", 308),
            ("l1", 310),
            ("r1", 311),
            ("select", 314),
            ("start", 315),
            ("home", 316),
            ("ls", 317),
            ("rs", 318),
        ]),
        centred_axes: sticks([0, 1, 3, 4], -32768, 32767),
        trigger_axes: triggers(2, 5, 1023),
        binary_axes: dpad(),
    }
}

fn xbox_one_wireless() -> ControllerProfile {
    ControllerProfile {
        name: "Xbox One S (wireless)".to_string(),
        vendor_id: MICROSOFT_VENDOR_ID,
        product_ids: vec![0x02e0],
        dead_zone: 0.1,
        hot_zone: 0.05,
        buttons: buttons(&[
            ("cross", 304),
            ("circle", 305),
            ("square", 306),
            ("triangle", 307),
            ("l1", 308),
            ("r1", 309),
            ("select", 310),
            ("start", 311),
            ("ls", 312),
            ("rs", 313),
            ("home", 139),
        ]),
        centred_axes: sticks([0, 1, 3, 4], 0, 65535),
        trigger_axes: triggers(2, 5, 1023),
        binary_axes: dpad(),
    }
}
