//! Per-lens zoom range and native mapping.

use crate::config::ControllerConfig;
use crate::device::{DeviceCapability, LensType};

/// User-facing zoom range of a lens with its native mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    min: f64,
    max: f64,
    /// User-facing zoom per unit of native zoom.
    scale: f64,
}

impl ZoomRange {
    /// Creates a range; `max` is raised to `min` if smaller.
    pub fn new(min: f64, max: f64, scale: f64) -> Self {
        Self {
            min,
            max: max.max(min),
            scale,
        }
    }

    /// Derives the user-facing range of a device.
    pub fn for_device(
        capability: &DeviceCapability,
        lens: LensType,
        config: &ControllerConfig,
    ) -> Self {
        let scale = match lens {
            LensType::UltraWide => config.ultra_wide_scale,
            LensType::WideAngle => 1.0,
        };
        let min = capability.min_zoom_factor * scale;
        let max = (capability.max_zoom_factor * scale).min(config.max_user_zoom);
        Self::new(min, max, scale)
    }

    /// Lowest user-facing zoom.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Highest user-facing zoom.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Clamps a user-facing factor into the range.
    pub fn clamp(&self, factor: f64) -> f64 {
        if factor.is_nan() {
            return self.min;
        }
        factor.clamp(self.min, self.max)
    }

    /// Whether a user-facing factor lies in the range.
    pub fn contains(&self, factor: f64) -> bool {
        factor >= self.min && factor <= self.max
    }

    /// User-facing to native zoom.
    #[inline]
    pub fn to_native(&self, user_facing: f64) -> f64 {
        user_facing / self.scale
    }

    /// Native to user-facing zoom.
    #[inline]
    pub fn to_user_facing(&self, native: f64) -> f64 {
        native * self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ultra_wide_mapping() {
        let caps = DeviceCapability::full(4.0);
        let range = ZoomRange::for_device(&caps, LensType::UltraWide, &ControllerConfig::default());
        assert_eq!(range.min(), 0.5);
        assert_eq!(range.max(), 2.0);
        assert_eq!(range.to_native(0.5), 1.0);
        assert_eq!(range.to_user_facing(1.0), 0.5);
    }

    #[test]
    fn test_wide_capped_by_config() {
        let caps = DeviceCapability::full(120.0);
        let range = ZoomRange::for_device(&caps, LensType::WideAngle, &ControllerConfig::default());
        assert_eq!(range.min(), 1.0);
        assert_eq!(range.max(), 10.0);
    }

    #[test]
    fn test_clamp() {
        let range = ZoomRange::new(0.5, 10.0, 1.0);
        assert_eq!(range.clamp(-3.0), 0.5);
        assert_eq!(range.clamp(12.0), 10.0);
        assert_eq!(range.clamp(f64::NAN), 0.5);
        assert!(range.contains(4.0));
    }
}
