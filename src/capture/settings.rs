//! Flash, rotation and orientation for still captures.

use crate::device::CameraPosition;
use serde::{Deserialize, Serialize};

/// Flash mode requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlashMode {
    Off,
    Auto,
    On,
}

impl FlashMode {
    /// Next mode in the `Off → Auto → On → Off` cycle.
    pub fn next(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::Auto,
            FlashMode::Auto => FlashMode::On,
            FlashMode::On => FlashMode::Off,
        }
    }
}

/// Trade-off between capture latency and image quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityPrioritization {
    Speed,
    Balanced,
    Quality,
}

/// Physical orientation of the handset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceOrientation {
    Portrait,
    PortraitUpsideDown,
    /// Rotated counter-clockwise; the sensor's native landscape.
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

impl DeviceOrientation {
    /// Whether the orientation says where the horizon is.
    pub fn is_horizon_relevant(self) -> bool {
        !matches!(
            self,
            DeviceOrientation::FaceUp | DeviceOrientation::FaceDown | DeviceOrientation::Unknown
        )
    }

    /// Rotation in degrees that makes the output horizon-level.
    pub fn rotation_angle(self) -> u32 {
        match self {
            DeviceOrientation::LandscapeLeft => 0,
            DeviceOrientation::LandscapeRight => 180,
            DeviceOrientation::PortraitUpsideDown => 270,
            _ => 90,
        }
    }

    /// EXIF orientation code of an unrotated sensor image.
    pub fn exif_orientation(self) -> u32 {
        match self {
            DeviceOrientation::LandscapeLeft => 1,
            DeviceOrientation::LandscapeRight => 3,
            DeviceOrientation::PortraitUpsideDown => 8,
            _ => 6,
        }
    }
}

/// Settings for a single capture.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSettings {
    /// Flash mode actually used.
    pub flash: FlashMode,
    /// Quality prioritization.
    pub quality: QualityPrioritization,
    /// Rotation applied to the output, in degrees.
    pub rotation_degrees: u32,
    /// Orientation the capture was taken in.
    pub orientation: DeviceOrientation,
}

impl PhotoSettings {
    /// Builds capture settings.
    ///
    /// Flash is always off on the front camera; otherwise the requested mode
    /// is used only if the output supports it.
    pub fn for_capture(
        position: CameraPosition,
        requested_flash: FlashMode,
        supported_flash: &[FlashMode],
        orientation: DeviceOrientation,
    ) -> Self {
        let flash = match position {
            CameraPosition::Front => FlashMode::Off,
            CameraPosition::Back if supported_flash.contains(&requested_flash) => requested_flash,
            CameraPosition::Back => FlashMode::Off,
        };
        Self {
            flash,
            quality: QualityPrioritization::Quality,
            rotation_degrees: orientation.rotation_angle(),
            orientation,
        }
    }
}

/// Encoded photo returned by the output.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// EXIF orientation from the photo metadata, if the output reports one.
    pub exif_orientation: Option<u32>,
}

impl CapturedPhoto {
    /// Orientation code to store with the image.
    pub fn orientation_code(&self, settings: &PhotoSettings) -> u32 {
        self.exif_orientation
            .unwrap_or_else(|| settings.orientation.exif_orientation())
    }
}
