//! # Padsense Library
//!
//! Read any supported game controller through one uniform set of named
//! buttons and calibrated axes.
//!
//! This library converts raw evdev events into corrected stick, trigger and
//! d-pad values and into press, release and hold-duration semantics, so
//! client code never needs per-device logic.

pub mod config;
pub mod error;
pub mod controller;
pub mod device;
pub mod profile;
pub mod pump;
