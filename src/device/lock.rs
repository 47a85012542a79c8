//! RAII device configuration lock.

use super::hardware::{CaptureDevice, HardwareError};
use super::types::{
    ExposureMode, FocusMode, NormalizedPoint, WhiteBalanceGains, WhiteBalanceMode,
};

/// Exclusive configuration window on a single device.
///
/// Every property write goes through this guard. Writes the device's
/// capability set does not support are skipped and reported as `false`.
/// The lock is released when the guard drops, on every exit path.
pub struct ConfigurationLock<'a> {
    device: &'a dyn CaptureDevice,
}

impl<'a> ConfigurationLock<'a> {
    /// Acquires the device's configuration lock.
    pub fn acquire(device: &'a dyn CaptureDevice) -> Result<Self, HardwareError> {
        device.lock_for_configuration()?;
        tracing::trace!(device = %device.id(), "Configuration lock acquired");
        Ok(Self { device })
    }

    /// The locked device.
    pub fn device(&self) -> &dyn CaptureDevice {
        self.device
    }

    /// Writes a native zoom factor, clamped to the device range.
    pub fn set_zoom_factor(&self, factor: f64) -> f64 {
        let factor = self.device.capability().clamp_zoom(factor);
        self.device.set_zoom_factor(factor);
        factor
    }

    /// Sets the focus mode, with an optional point of interest.
    pub fn set_focus(&self, mode: FocusMode, point: Option<NormalizedPoint>) -> bool {
        let caps = self.device.capability();
        if !caps.supports_focus_mode(mode) {
            return false;
        }
        if let Some(point) = point {
            if !caps.focus_point_of_interest {
                return false;
            }
            self.device.set_focus_point_of_interest(point);
        }
        self.device.set_focus_mode(mode);
        true
    }

    /// Sets the exposure mode, with an optional point of interest.
    pub fn set_exposure(&self, mode: ExposureMode, point: Option<NormalizedPoint>) -> bool {
        let caps = self.device.capability();
        if !caps.supports_exposure_mode(mode) {
            return false;
        }
        if let Some(point) = point {
            if !caps.exposure_point_of_interest {
                return false;
            }
            self.device.set_exposure_point_of_interest(point);
        }
        self.device.set_exposure_mode(mode);
        true
    }

    /// Returns white balance to continuous-auto.
    pub fn set_white_balance_auto(&self) -> bool {
        if !self
            .device
            .capability()
            .supports_white_balance_mode(WhiteBalanceMode::ContinuousAuto)
        {
            return false;
        }
        self.device
            .set_white_balance_mode(WhiteBalanceMode::ContinuousAuto);
        true
    }

    /// Locks white balance at `gains`, clamped to the device gain ceiling.
    pub fn lock_white_balance(&self, gains: WhiteBalanceGains) -> Option<WhiteBalanceGains> {
        let caps = self.device.capability();
        if !caps.supports_white_balance_mode(WhiteBalanceMode::Locked) {
            return None;
        }
        let gains = gains.clamped(caps.max_white_balance_gain);
        self.device.set_white_balance_locked_with_gains(gains);
        Some(gains)
    }

    /// Freezes the gains continuous-auto would choose right now.
    ///
    /// Continuous-auto is applied first so the lock never captures stale gains.
    pub fn lock_white_balance_at_current(&self) -> Option<WhiteBalanceGains> {
        self.set_white_balance_auto();
        let current = self.device.white_balance_gains();
        self.lock_white_balance(current)
    }

    /// Turns on subject-area change monitoring where available.
    pub fn set_subject_area_monitoring(&self, enabled: bool) -> bool {
        if !self.device.capability().subject_area_monitoring {
            return false;
        }
        self.device.set_subject_area_change_monitoring(enabled);
        true
    }

    /// Puts focus, exposure and white balance back to continuous-auto.
    pub fn restore_continuous_auto(&self) {
        self.set_focus(FocusMode::ContinuousAuto, None);
        self.set_exposure(ExposureMode::ContinuousAuto, None);
        self.set_white_balance_auto();
    }
}

impl Drop for ConfigurationLock<'_> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
        tracing::trace!(device = %self.device.id(), "Configuration lock released");
    }
}
