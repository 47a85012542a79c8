//! Static facts about a physical camera unit.
//!
//! Callers branch on these before attempting a mode transition, so an
//! unsupported transition is never sent to the hardware.

use super::types::{ExposureMode, FocusMode, WhiteBalanceMode};
use serde::{Deserialize, Serialize};

/// Maximum still-photo dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Capability set of a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapability {
    /// Supported focus modes.
    pub focus_modes: Vec<FocusMode>,
    /// Whether a focus point of interest can be set.
    pub focus_point_of_interest: bool,
    /// Supported exposure modes.
    pub exposure_modes: Vec<ExposureMode>,
    /// Whether an exposure point of interest can be set.
    pub exposure_point_of_interest: bool,
    /// Supported white-balance modes.
    pub white_balance_modes: Vec<WhiteBalanceMode>,
    /// Whether subject-area change monitoring is available.
    pub subject_area_monitoring: bool,
    /// Smallest native zoom factor.
    pub min_zoom_factor: f64,
    /// Native zoom factor ceiling.
    pub max_zoom_factor: f64,
    /// Largest white-balance gain any channel accepts.
    pub max_white_balance_gain: f64,
    /// Maximum still-photo dimensions.
    pub max_photo_dimensions: PhotoDimensions,
}

impl Default for DeviceCapability {
    fn default() -> Self {
        Self::full(16.0)
    }
}

impl DeviceCapability {
    /// A device supporting every mode and point of interest.
    pub fn full(max_zoom_factor: f64) -> Self {
        Self {
            focus_modes: vec![
                FocusMode::ContinuousAuto,
                FocusMode::AutoFocus,
                FocusMode::Locked,
            ],
            focus_point_of_interest: true,
            exposure_modes: vec![
                ExposureMode::ContinuousAuto,
                ExposureMode::AutoExpose,
                ExposureMode::Locked,
            ],
            exposure_point_of_interest: true,
            white_balance_modes: vec![WhiteBalanceMode::ContinuousAuto, WhiteBalanceMode::Locked],
            subject_area_monitoring: true,
            min_zoom_factor: 1.0,
            max_zoom_factor,
            max_white_balance_gain: 4.0,
            max_photo_dimensions: PhotoDimensions {
                width: 4032,
                height: 3024,
            },
        }
    }

    /// A fixed-focus unit, typical of front cameras.
    pub fn fixed_focus(max_zoom_factor: f64) -> Self {
        Self {
            focus_modes: vec![FocusMode::Locked],
            focus_point_of_interest: false,
            max_photo_dimensions: PhotoDimensions {
                width: 3088,
                height: 2316,
            },
            ..Self::full(max_zoom_factor)
        }
    }

    /// Returns a copy with a different white-balance gain ceiling.
    pub fn with_max_white_balance_gain(mut self, max_gain: f64) -> Self {
        self.max_white_balance_gain = max_gain;
        self
    }

    /// Returns true if the focus mode is supported.
    #[inline]
    pub fn supports_focus_mode(&self, mode: FocusMode) -> bool {
        self.focus_modes.contains(&mode)
    }

    /// Returns true if the exposure mode is supported.
    #[inline]
    pub fn supports_exposure_mode(&self, mode: ExposureMode) -> bool {
        self.exposure_modes.contains(&mode)
    }

    /// Returns true if the white-balance mode is supported.
    #[inline]
    pub fn supports_white_balance_mode(&self, mode: WhiteBalanceMode) -> bool {
        self.white_balance_modes.contains(&mode)
    }

    /// Clamps a native zoom factor into the supported range.
    pub fn clamp_zoom(&self, factor: f64) -> f64 {
        factor.clamp(self.min_zoom_factor, self.max_zoom_factor.max(self.min_zoom_factor))
    }
}
