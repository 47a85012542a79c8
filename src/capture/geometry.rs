//! Mapping between device-normalized and display coordinates.
//!
//! The sensor is mounted rotated 90° relative to the portrait preview:
//! `display_x = device_y * width`, `display_y = (1 - device_x) * height`.

use crate::device::NormalizedPoint;
use serde::{Deserialize, Serialize};

/// A point in preview (display) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

/// Size of the preview surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewGeometry {
    width: f64,
    height: f64,
}

impl Default for PreviewGeometry {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl PreviewGeometry {
    /// Creates a geometry; non-positive sizes become 1.
    pub fn new(width: f64, height: f64) -> Self {
        let sanitize = |v: f64| if v > 0.0 && v.is_finite() { v } else { 1.0 };
        Self {
            width: sanitize(width),
            height: sanitize(height),
        }
    }

    /// Device-normalized point to display coordinates.
    pub fn to_display(&self, point: NormalizedPoint) -> DisplayPoint {
        DisplayPoint {
            x: point.y * self.width,
            y: (1.0 - point.x) * self.height,
        }
    }

    /// Display coordinates to a device-normalized point.
    pub fn to_device(&self, point: DisplayPoint) -> NormalizedPoint {
        NormalizedPoint::new(1.0 - point.y / self.height, point.x / self.width)
    }
}
