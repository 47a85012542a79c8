//! Zoom smoothing and pinch mapping.

use super::range::ZoomRange;
use crate::config::ControllerConfig;
use crate::device::{CaptureDevice, ConfigurationLock};
use crate::error::ControllerError;

/// Zoom and pinch scale captured when a gesture starts.
#[derive(Debug, Clone, Copy)]
struct PinchAnchor {
    zoom: f64,
    scale: f64,
}

/// Maintains the smoothed zoom of the active lens.
///
/// The smoothed factor always lies within the active [`ZoomRange`]: targets
/// are clamped before smoothing, and smoothing moves only part of the way
/// from one in-range value toward another.
#[derive(Debug, Clone)]
pub struct ZoomController {
    range: ZoomRange,
    smoothed: f64,
    target: f64,
    smoothing: f64,
    sensitivity: f64,
    anchor: Option<PinchAnchor>,
    last_scale: f64,
}

impl ZoomController {
    /// Creates a controller over `range`, starting at its minimum.
    pub fn new(range: ZoomRange, config: &ControllerConfig) -> Self {
        Self::with_factors(range, config.smoothing_factor, config.pinch_sensitivity)
    }

    /// Creates a controller with explicit smoothing and sensitivity.
    pub fn with_factors(range: ZoomRange, smoothing: f64, sensitivity: f64) -> Self {
        Self {
            range,
            smoothed: range.min(),
            target: range.min(),
            smoothing,
            sensitivity,
            anchor: None,
            last_scale: 1.0,
        }
    }

    /// Current user-facing smoothed zoom.
    pub fn current(&self) -> f64 {
        self.smoothed
    }

    /// Most recent clamped target.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Active range.
    pub fn range(&self) -> ZoomRange {
        self.range
    }

    /// Moves the smoothed zoom toward `factor` and writes it to the device.
    ///
    /// If the configuration lock cannot be acquired the state is unchanged;
    /// the next gesture frame retries naturally.
    pub fn set_target_zoom(
        &mut self,
        device: &dyn CaptureDevice,
        factor: f64,
    ) -> Result<f64, ControllerError> {
        let target = self.range.clamp(factor);
        let next = self
            .range
            .clamp(self.smoothed + (target - self.smoothed) * self.smoothing);

        let lock = ConfigurationLock::acquire(device)
            .map_err(|e| ControllerError::lock_failed(device.id(), e))?;
        let native = lock.set_zoom_factor(self.range.to_native(next));
        drop(lock);

        self.target = target;
        self.smoothed = next;
        tracing::trace!(target, zoom = next, native, "Zoom applied");
        Ok(next)
    }

    /// Maps a pinch frame to an unclamped target zoom.
    ///
    /// `delta = (scale / anchor_scale)^sensitivity - 1`, spread over the
    /// whole range from the zoom captured at gesture start.
    pub fn pinch_target(&mut self, scale: f64, is_gesture_start: bool) -> f64 {
        if is_gesture_start || self.anchor.is_none() {
            self.anchor = Some(PinchAnchor {
                zoom: self.smoothed,
                scale: 1.0,
            });
        }
        if !(scale > 0.0) || !scale.is_finite() {
            return self.smoothed;
        }
        self.last_scale = scale;

        let anchor = self.anchor.unwrap_or(PinchAnchor {
            zoom: self.smoothed,
            scale: 1.0,
        });
        let delta = (scale / anchor.scale).powf(self.sensitivity) - 1.0;
        anchor.zoom + delta * (self.range.max() - self.range.min())
    }

    /// Applies a pinch frame.
    pub fn handle_pinch(
        &mut self,
        device: &dyn CaptureDevice,
        scale: f64,
        is_gesture_start: bool,
    ) -> Result<f64, ControllerError> {
        let target = self.pinch_target(scale, is_gesture_start);
        self.set_target_zoom(device, target)
    }

    /// Adopts the range of a newly active lens at the given native zoom.
    ///
    /// A gesture in progress is re-anchored so it continues smoothly on the
    /// new lens instead of jumping back across the threshold.
    pub fn reset(&mut self, range: ZoomRange, native_zoom: f64) {
        self.range = range;
        self.smoothed = range.clamp(range.to_user_facing(native_zoom));
        self.target = self.smoothed;
        if self.anchor.is_some() {
            self.anchor = Some(PinchAnchor {
                zoom: self.smoothed,
                scale: self.last_scale,
            });
        }
    }
}
