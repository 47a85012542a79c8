//! Identities, mode enums and value types shared by every controller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Optical unit on a given camera assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LensType {
    /// Ultra-wide lens (back assembly only).
    UltraWide,
    /// Standard wide-angle lens.
    WideAngle,
}

/// Front- or back-facing camera assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraPosition {
    /// User-facing camera.
    Front,
    /// World-facing camera.
    Back,
}

impl CameraPosition {
    /// Returns the opposite assembly.
    pub fn toggled(self) -> Self {
        match self {
            CameraPosition::Front => CameraPosition::Back,
            CameraPosition::Back => CameraPosition::Front,
        }
    }
}

/// Stable identity of a physical camera unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates an identity from a backend-specific unique id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Canonical identity for a lens/position pair.
    pub fn for_unit(lens: LensType, position: CameraPosition) -> Self {
        let lens = match lens {
            LensType::UltraWide => "ultra-wide",
            LensType::WideAngle => "wide-angle",
        };
        let position = match position {
            CameraPosition::Front => "front",
            CameraPosition::Back => "back",
        };
        Self(format!("{}-{}", position, lens))
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Focus mode of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FocusMode {
    /// Hardware refocuses continuously.
    ContinuousAuto,
    /// Single autofocus pass at the point of interest.
    AutoFocus,
    /// Lens position frozen.
    Locked,
}

/// Exposure mode of a device. Mirrors the focus-mode domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExposureMode {
    /// Hardware adjusts exposure continuously.
    ContinuousAuto,
    /// Single exposure pass at the point of interest.
    AutoExpose,
    /// Exposure frozen.
    Locked,
}

/// White-balance mode of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WhiteBalanceMode {
    /// Hardware adjusts gains continuously.
    ContinuousAuto,
    /// Gains frozen at explicit values.
    Locked,
}

/// Per-channel white-balance gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhiteBalanceGains {
    /// Red channel gain.
    pub red: f64,
    /// Green channel gain.
    pub green: f64,
    /// Blue channel gain.
    pub blue: f64,
}

impl WhiteBalanceGains {
    /// Unity gains, the neutral value every device accepts.
    pub const UNITY: Self = Self {
        red: 1.0,
        green: 1.0,
        blue: 1.0,
    };

    /// Creates gains from channel values.
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    /// Clamps every channel to `[1.0, max_gain]`.
    ///
    /// Non-finite channels carry no preference and become unity.
    pub fn clamped(self, max_gain: f64) -> Self {
        let ceiling = max_gain.max(1.0);
        let clamp = |gain: f64| {
            if gain.is_finite() {
                gain.clamp(1.0, ceiling)
            } else {
                1.0
            }
        };
        Self {
            red: clamp(self.red),
            green: clamp(self.green),
            blue: clamp(self.blue),
        }
    }
}

/// A point in device-normalized space, both axes in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    /// Horizontal sensor coordinate.
    pub x: f64,
    /// Vertical sensor coordinate.
    pub y: f64,
}

impl NormalizedPoint {
    /// Center of the sensor.
    pub const CENTER: Self = Self { x: 0.5, y: 0.5 };

    /// Creates a point, clamping both axes into `0..=1`.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }
}
