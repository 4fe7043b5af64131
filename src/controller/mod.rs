//! # Controller Module
//!
//! Game controller input normalization.
//!
//! This module handles:
//! - Dead zone and hot zone shaping
//! - Auto-ranging stick, trigger and d-pad axes
//! - Circular (radial) stick shaping
//! - Button state, hold durations and press history
//! - Name-based access to every control through a thread-safe facade

pub mod axis;
pub mod buttons;
pub mod calibration;
pub mod circular;
pub mod facade;
pub mod registry;

pub use facade::Controller;
