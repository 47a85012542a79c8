//! Focus, exposure and white-balance mode transitions.

use super::state::{FocusRequest, FocusState};
use crate::config::ControllerConfig;
use crate::device::{
    CaptureDevice, ConfigurationLock, DeviceId, ExposureMode, FocusMode, NormalizedPoint,
};
use crate::error::ControllerError;
use crate::session::{lock_unpoisoned, TaskScheduler, TimerKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct FocusBook {
    states: HashMap<DeviceId, FocusState>,
    last_points: HashMap<DeviceId, NormalizedPoint>,
}

/// Drives tap-to-focus and returns devices to continuous-auto.
///
/// At most one auto-reset is pending per device; a newer tap or scene
/// change replaces it. All mode writes happen under the device's
/// configuration lock, and a failed lock leaves state untouched.
pub struct FocusExposureController {
    config: ControllerConfig,
    scheduler: TaskScheduler,
    book: Arc<Mutex<FocusBook>>,
}

impl FocusExposureController {
    /// Creates a controller scheduling its resets on `scheduler`.
    pub fn new(config: ControllerConfig, scheduler: TaskScheduler) -> Self {
        Self {
            config,
            scheduler,
            book: Arc::new(Mutex::new(FocusBook::default())),
        }
    }

    /// Focuses and exposes at the requested point.
    pub fn tap(
        &self,
        device: &Arc<dyn CaptureDevice>,
        request: &FocusRequest,
    ) -> Result<FocusState, ControllerError> {
        let point = request.point;
        let state = {
            let lock = ConfigurationLock::acquire(device.as_ref())
                .map_err(|e| ControllerError::lock_failed(device.id(), e))?;
            lock.set_focus(FocusMode::AutoFocus, Some(point));
            lock.set_exposure(ExposureMode::ContinuousAuto, Some(point));

            let locked_gains = if request.lock_white_balance {
                lock.lock_white_balance_at_current()
            } else {
                lock.set_white_balance_auto();
                None
            };
            match locked_gains {
                Some(gains) => FocusState::LockedWhiteBalance { point, gains },
                None => FocusState::TapFocus { point },
            }
        };

        {
            let mut book = lock_unpoisoned(&self.book);
            book.states.insert(device.id().clone(), state);
            book.last_points.insert(device.id().clone(), point);
        }
        tracing::debug!(
            device = %device.id(),
            x = point.x,
            y = point.y,
            lock_white_balance = request.lock_white_balance,
            requested_at = %request.created_at,
            "Tap to focus"
        );

        let delay = self
            .config
            .focus_reset_delay(matches!(state, FocusState::LockedWhiteBalance { .. }));
        self.schedule_reset(device, delay);
        Ok(state)
    }

    /// Refocuses at the last tapped point after the scene changed.
    pub fn subject_area_changed(
        &self,
        device: &Arc<dyn CaptureDevice>,
    ) -> Result<NormalizedPoint, ControllerError> {
        let point = self.last_point(device.id()).unwrap_or(NormalizedPoint::CENTER);
        {
            let lock = ConfigurationLock::acquire(device.as_ref())
                .map_err(|e| ControllerError::lock_failed(device.id(), e))?;
            lock.set_focus(FocusMode::AutoFocus, Some(point));
            lock.set_exposure(ExposureMode::ContinuousAuto, Some(point));
        }
        {
            let mut book = lock_unpoisoned(&self.book);
            let state = match book.states.get(device.id()) {
                Some(FocusState::LockedWhiteBalance { gains, .. }) => {
                    FocusState::LockedWhiteBalance {
                        point,
                        gains: *gains,
                    }
                }
                _ => FocusState::TapFocus { point },
            };
            book.states.insert(device.id().clone(), state);
        }
        tracing::debug!(device = %device.id(), x = point.x, y = point.y, "Subject area changed");

        self.schedule_reset(device, self.config.subject_area_reset_delay());
        Ok(point)
    }

    /// Restores continuous-auto now, as the auto-reset timer would.
    pub fn auto_reset(&self, device: &dyn CaptureDevice) -> Result<bool, ControllerError> {
        reset_to_continuous_auto(&self.book, device)
    }

    /// State the controller last drove the device into.
    pub fn state(&self, device: &DeviceId) -> FocusState {
        lock_unpoisoned(&self.book)
            .states
            .get(device)
            .copied()
            .unwrap_or(FocusState::ContinuousAuto)
    }

    /// Last tapped point on the device.
    pub fn last_point(&self, device: &DeviceId) -> Option<NormalizedPoint> {
        lock_unpoisoned(&self.book).last_points.get(device).copied()
    }

    /// Whether an auto-reset is pending for the device.
    pub fn reset_pending(&self, device: &DeviceId) -> bool {
        self.scheduler
            .is_pending(&TimerKey::FocusReset(device.clone()))
    }

    /// Forgets a device leaving the session and cancels its reset.
    pub fn retire(&self, device: &DeviceId) {
        self.scheduler.cancel(&TimerKey::FocusReset(device.clone()));
        let mut book = lock_unpoisoned(&self.book);
        book.states.remove(device);
        book.last_points.remove(device);
    }

    fn schedule_reset(&self, device: &Arc<dyn CaptureDevice>, delay: Duration) {
        let book = Arc::clone(&self.book);
        let target = Arc::clone(device);
        self.scheduler
            .schedule(TimerKey::FocusReset(device.id().clone()), delay, move || {
                if let Err(e) = reset_to_continuous_auto(&book, target.as_ref()) {
                    tracing::warn!(device = %target.id(), error = %e, "Auto-reset skipped");
                }
            });
    }
}

/// Returns the device to continuous-auto unless focus was locked.
///
/// Fixed-focus units report `Locked` permanently, so the check only applies
/// where continuous-auto focus exists.
fn reset_to_continuous_auto(
    book: &Mutex<FocusBook>,
    device: &dyn CaptureDevice,
) -> Result<bool, ControllerError> {
    let can_autofocus = device
        .capability()
        .supports_focus_mode(FocusMode::ContinuousAuto);
    if can_autofocus && device.focus_mode() == FocusMode::Locked {
        tracing::debug!(device = %device.id(), "Focus locked; auto-reset skipped");
        return Ok(false);
    }

    {
        let lock = ConfigurationLock::acquire(device)
            .map_err(|e| ControllerError::lock_failed(device.id(), e))?;
        lock.restore_continuous_auto();
    }
    lock_unpoisoned(book)
        .states
        .insert(device.id().clone(), FocusState::ContinuousAuto);
    tracing::debug!(device = %device.id(), "Restored continuous-auto");
    Ok(true)
}
