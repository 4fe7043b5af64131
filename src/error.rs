//! # Error Types
//!
//! Custom error types for Padsense using `thiserror`.
//!
//! Unmapped raw event codes are deliberately absent from this taxonomy: they
//! are expected on partially profiled hardware and are only logged.

use thiserror::Error;

/// Main error type for Padsense
#[derive(Debug, Error)]
pub enum PadError {
    /// Invalid control construction parameters (dead/hot zones, ranges, names).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A standard name that this controller does not have.
    ///
    /// Callers should treat this as "the hardware lacks this control" and adapt.
    #[error("Unknown control: {0}")]
    UnknownControl(String),

    /// Configuration file parsing or validation errors
    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    /// Input device errors
    #[error("Device error: {0}")]
    Device(String),

    /// No attached input device matched a known controller profile
    #[error("No supported controller found")]
    ControllerNotFound,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Padsense
pub type Result<T> = std::result::Result<T, PadError>;
