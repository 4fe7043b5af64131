//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section is optional; an empty file yields a configuration that
//! scans for any supported controller with the profile's own calibration.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::controller::calibration::Zones;
use crate::controller::registry::ControlRegistry;
use crate::error::{PadError, Result};
use crate::profile::{find_profile_by_name, ControllerProfile};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    /// User-defined controller profiles, checked before the built-ins.
    #[serde(default)]
    pub profiles: Vec<ControllerProfile>,
}

/// Input device selection
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeviceConfig {
    /// `/dev/input/eventN` to open; empty scans for a supported controller.
    #[serde(default)]
    pub path: String,

    /// Force a profile by name instead of matching vendor/product IDs.
    #[serde(default)]
    pub profile: Option<String>,

    /// Take exclusive access to the device.
    #[serde(default)]
    pub grab: bool,
}

/// Global dead/hot zone overrides applied to every analogue axis
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub dead_zone: Option<f32>,

    #[serde(default)]
    pub hot_zone: Option<f32>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rolling log files; console only when absent.
    #[serde(default)]
    pub log_dir: Option<String>,
}

/// Monitor loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

// Default value functions
fn default_log_level() -> String { "info".to_string() }

fn default_poll_interval_ms() -> u64 { 100 }
fn default_channel_capacity() -> usize { 256 }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl CalibrationConfig {
    /// Resolves the overrides against a profile's own zones.
    ///
    /// Returns `None` when nothing is overridden.
    pub fn zones_for(&self, profile: &ControllerProfile) -> Result<Option<Zones>> {
        if self.dead_zone.is_none() && self.hot_zone.is_none() {
            return Ok(None);
        }
        Zones::new(
            self.dead_zone.unwrap_or(profile.dead_zone),
            self.hot_zone.unwrap_or(profile.hot_zone),
        )
        .map(Some)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use padsense::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `ConfigFile` for out-of-range settings and `Configuration` for
    /// invalid zones or profiles.
    fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(PadError::ConfigFile(toml::de::Error::custom(format!(
                "logging level must be one of: {}",
                LOG_LEVELS.join(", ")
            ))));
        }

        if let Some(dir) = &self.logging.log_dir {
            if dir.is_empty() {
                return Err(PadError::ConfigFile(toml::de::Error::custom(
                    "logging log_dir cannot be empty when set",
                )));
            }
        }

        if self.monitor.poll_interval_ms == 0 || self.monitor.poll_interval_ms > 60000 {
            return Err(PadError::ConfigFile(toml::de::Error::custom(
                "poll_interval_ms must be between 1 and 60000",
            )));
        }

        if self.monitor.channel_capacity == 0 {
            return Err(PadError::ConfigFile(toml::de::Error::custom(
                "channel_capacity must be greater than 0",
            )));
        }

        // Overrides must be valid on their own, whatever the profile
        Zones::new(
            self.calibration.dead_zone.unwrap_or(0.0),
            self.calibration.hot_zone.unwrap_or(0.0),
        )?;

        for profile in &self.profiles {
            if profile.name.is_empty() {
                return Err(PadError::ConfigFile(toml::de::Error::custom(
                    "profile name cannot be empty",
                )));
            }
            ControlRegistry::from_profile(profile, None).map_err(|e| {
                PadError::Configuration(format!("profile '{}': {}", profile.name, e))
            })?;
        }

        if let Some(name) = &self.device.profile {
            if find_profile_by_name(name, &self.profiles).is_none() {
                return Err(PadError::ConfigFile(toml::de::Error::custom(format!(
                    "unknown profile '{}'",
                    name
                ))));
            }
        }

        Ok(())
    }
}
