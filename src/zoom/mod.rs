//! Smoothed, range-clamped zoom.
//!
//! The user-facing zoom and the device-native zoom factor differ by a
//! per-lens linear mapping: the ultra-wide lens reports a user-facing
//! range that starts below 1.0.

mod controller;
mod range;

pub use controller::ZoomController;
pub use range::ZoomRange;
