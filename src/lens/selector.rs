//! Lens/position decisions and the atomic switch protocol.
//!
//! A switch removes the outgoing device and installs the incoming one inside
//! a single session transaction, configuring the incoming device under its
//! own configuration lock (transaction outermost, device lock innermost).
//! The transaction always commits and the configuring guard is always
//! cleared, including on error returns and panics: a transaction left open
//! or a guard left set would wedge the camera.

use super::white_balance::{apply_carry_over, CarryOver, WhiteBalanceSnapshot};
use crate::config::ControllerConfig;
use crate::device::{
    CameraPosition, CaptureDevice, ConfigurationLock, DeviceDiscovery, ExposureMode, FocusMode,
    LensType, SubjectAreaCallback,
};
use crate::error::ControllerError;
use crate::session::{
    lock_unpoisoned, ConfiguringGuard, ConfiguringToken, SessionTransaction,
    SessionTransactionManager, TaskScheduler, TimerKey,
};
use crate::zoom::ZoomRange;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// The device currently attached as session input.
#[derive(Clone)]
pub struct ActiveCamera {
    /// Attached device.
    pub device: Arc<dyn CaptureDevice>,
    /// Lens actually in use (after any fallback).
    pub lens: LensType,
    /// Position in use.
    pub position: CameraPosition,
}

impl fmt::Debug for ActiveCamera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveCamera")
            .field("device", self.device.id())
            .field("lens", &self.lens)
            .field("position", &self.position)
            .finish()
    }
}

/// A requested lens or position change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRequest {
    /// Change lens on the current position, carrying white balance over.
    Lens(LensType),
    /// Change position; white balance resets to continuous-auto.
    Position(CameraPosition),
}

/// Collaborators a switch runs against.
pub struct SwitchEnv<'a> {
    /// Session transaction manager.
    pub transactions: &'a SessionTransactionManager,
    /// Scheduler for the white-balance auto-resume.
    pub scheduler: &'a TaskScheduler,
    /// Observer registered on whichever device becomes active.
    pub observer: SubjectAreaCallback,
}

/// Result of a completed switch.
#[derive(Debug)]
pub struct SwitchOutcome {
    /// The newly active camera.
    pub active: ActiveCamera,
    /// User-facing zoom range of the new lens.
    pub range: ZoomRange,
    /// White-balance carry-over, for lens switches.
    pub white_balance: Option<CarryOver>,
}

/// Re-attaches the outgoing device unless the switch completed.
///
/// If the re-attach fails too, the active slot is cleared so nothing
/// addresses a device the session no longer holds.
struct Rollback<'t, 'a> {
    tx: &'t SessionTransaction<'a>,
    active: &'t Mutex<Option<ActiveCamera>>,
    outgoing: Option<ActiveCamera>,
    observer: SubjectAreaCallback,
    armed: bool,
}

impl Drop for Rollback<'_, '_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(outgoing) = &self.outgoing else {
            return;
        };
        match self.tx.add_input(&outgoing.device) {
            Ok(()) => {
                outgoing
                    .device
                    .set_subject_area_observer(Some(Arc::clone(&self.observer)));
                tracing::warn!(device = %outgoing.device.id(), "Switch rolled back");
            }
            Err(e) => {
                *lock_unpoisoned(self.active) = None;
                tracing::error!(device = %outgoing.device.id(), error = %e, "Rollback failed; no input attached");
            }
        }
    }
}

/// Decides which device is active and performs switches.
pub struct LensSelector {
    discovery: Arc<dyn DeviceDiscovery>,
    config: ControllerConfig,
    guard: ConfiguringGuard,
    active: Mutex<Option<ActiveCamera>>,
    output_attached: AtomicBool,
}

impl LensSelector {
    /// Creates a selector with no active camera.
    pub fn new(discovery: Arc<dyn DeviceDiscovery>, config: ControllerConfig) -> Self {
        Self {
            discovery,
            config,
            guard: ConfiguringGuard::new(),
            active: Mutex::new(None),
            output_attached: AtomicBool::new(false),
        }
    }

    /// The reentrancy guard for switches.
    pub fn guard(&self) -> &ConfiguringGuard {
        &self.guard
    }

    /// Whether a switch is in progress. The active device is retired while set.
    pub fn is_configuring(&self) -> bool {
        self.guard.is_set()
    }

    /// The camera attached as session input.
    pub fn active(&self) -> Option<ActiveCamera> {
        lock_unpoisoned(&self.active).clone()
    }

    /// Whether the hardware has a device for the pair.
    pub fn has_device(&self, lens: LensType, position: CameraPosition) -> bool {
        self.discovery.device(lens, position).is_some()
    }

    /// Lens a pinch toward `raw_target` should move to, if any.
    ///
    /// Crossing the threshold downward selects ultra-wide on the back
    /// camera; crossing it upward returns to wide-angle.
    pub fn zoom_driven_lens(&self, raw_target: f64) -> Option<LensType> {
        let active = self.active()?;
        if active.position != CameraPosition::Back {
            return None;
        }
        let threshold = self.config.ultra_wide_threshold;
        match active.lens {
            LensType::WideAngle
                if raw_target < threshold
                    && self.has_device(LensType::UltraWide, CameraPosition::Back) =>
            {
                Some(LensType::UltraWide)
            }
            LensType::UltraWide if raw_target > threshold => Some(LensType::WideAngle),
            _ => None,
        }
    }

    /// Target lens and position for a request given the active camera.
    pub fn target_of(&self, request: SwitchRequest) -> (LensType, CameraPosition) {
        let position = self
            .active()
            .map(|a| a.position)
            .unwrap_or(CameraPosition::Back);
        match request {
            SwitchRequest::Lens(lens) => (lens, position),
            SwitchRequest::Position(position) => (LensType::WideAngle, position),
        }
    }

    /// Claims the guard for a switch, or rejects it.
    ///
    /// Rejected when a reconfiguration is already running, when no camera is
    /// attached, when the target equals the active camera, or when
    /// ultra-wide is asked for on the front.
    pub fn begin_switch(&self, request: SwitchRequest) -> Option<ConfiguringToken> {
        let Some(token) = self.guard.try_acquire() else {
            tracing::debug!(?request, "Switch in progress; request dropped");
            return None;
        };
        // The active camera only changes under the token.
        let Some(active) = self.active() else {
            tracing::debug!(?request, "No active camera; switch dropped");
            return None;
        };
        let (lens, position) = self.target_of(request);
        if lens == LensType::UltraWide && position == CameraPosition::Front {
            tracing::debug!("Ultra-wide is back-only; request dropped");
            return None;
        }
        if active.lens == lens && active.position == position {
            tracing::debug!(?lens, ?position, "Already active; switch skipped");
            return None;
        }
        Some(token)
    }

    /// Looks up a device, falling back from ultra-wide to wide-angle.
    pub fn resolve_device(
        &self,
        lens: LensType,
        position: CameraPosition,
    ) -> Result<(LensType, Arc<dyn CaptureDevice>), ControllerError> {
        if lens == LensType::UltraWide && position == CameraPosition::Back {
            if let Some(device) = self.discovery.device(lens, position) {
                return Ok((lens, device));
            }
            tracing::info!("Ultra-wide unavailable; falling back to wide-angle");
        }
        self.discovery
            .device(LensType::WideAngle, position)
            .map(|device| (LensType::WideAngle, device))
            .ok_or(ControllerError::DeviceUnavailable {
                lens: LensType::WideAngle,
                position,
            })
    }

    /// Runs a switch. The caller holds the configuring token throughout.
    pub fn run_switch(
        &self,
        env: &SwitchEnv<'_>,
        request: SwitchRequest,
    ) -> Result<SwitchOutcome, ControllerError> {
        let (lens, position) = self.target_of(request);
        let outgoing = self.active();

        // Front and back sensors are not comparable; only lens switches carry.
        let snapshot = match request {
            SwitchRequest::Lens(_) => outgoing
                .as_ref()
                .map(|a| WhiteBalanceSnapshot::capture(a.device.as_ref())),
            SwitchRequest::Position(_) => None,
        };

        let tx = env.transactions.begin();
        let mut rollback = Rollback {
            tx: &tx,
            active: &self.active,
            outgoing: outgoing.clone(),
            observer: Arc::clone(&env.observer),
            armed: true,
        };
        if let Some(outgoing) = &outgoing {
            outgoing.device.set_subject_area_observer(None);
            tx.remove_input(outgoing.device.id());
        }

        let (active, carry) = self
            .install(&tx, lens, position, snapshot.as_ref())
            .map_err(|e| match e {
                ControllerError::DeviceUnavailable { .. } => e,
                other => ControllerError::TransactionAbort(other.to_string()),
            })?;

        rollback.armed = false;
        drop(rollback);
        *lock_unpoisoned(&self.active) = Some(active.clone());
        tx.commit();

        self.finish_activation(env, &active, carry);
        tracing::info!(
            from = ?outgoing.as_ref().map(|a| a.device.id().clone()),
            to = %active.device.id(),
            "Camera switched"
        );
        Ok(SwitchOutcome {
            range: ZoomRange::for_device(active.device.capability(), active.lens, &self.config),
            active,
            white_balance: carry,
        })
    }

    /// Initial setup: attaches the photo output and the default camera.
    ///
    /// The photo output is attached once per session; a restart after
    /// [`LensSelector::deactivate`] only re-attaches the camera.
    pub fn activate_initial(&self, env: &SwitchEnv<'_>) -> Result<SwitchOutcome, ControllerError> {
        let tx = env.transactions.begin();
        if !self.output_attached.load(Ordering::Acquire) {
            tx.add_photo_output()?;
            self.output_attached.store(true, Ordering::Release);
        }

        let position = if self.has_device(LensType::WideAngle, CameraPosition::Back) {
            CameraPosition::Back
        } else {
            CameraPosition::Front
        };
        let (active, _) = self.install(&tx, LensType::WideAngle, position, None)?;
        *lock_unpoisoned(&self.active) = Some(active.clone());
        tx.commit();

        self.finish_activation(env, &active, None);
        tracing::info!(device = %active.device.id(), "Camera configured");
        Ok(SwitchOutcome {
            range: ZoomRange::for_device(active.device.capability(), active.lens, &self.config),
            active,
            white_balance: None,
        })
    }

    /// Detaches the active camera from the session.
    ///
    /// Returns the camera that was detached, if any.
    pub fn deactivate(&self, transactions: &SessionTransactionManager) -> Option<ActiveCamera> {
        let retired = lock_unpoisoned(&self.active).take()?;
        retired.device.set_subject_area_observer(None);
        let tx = transactions.begin();
        tx.remove_input(retired.device.id());
        tx.commit();
        tracing::info!(device = %retired.device.id(), "Camera detached");
        Some(retired)
    }

    /// Resolves and configures the incoming device and attaches it.
    fn install(
        &self,
        tx: &SessionTransaction<'_>,
        lens: LensType,
        position: CameraPosition,
        snapshot: Option<&WhiteBalanceSnapshot>,
    ) -> Result<(ActiveCamera, Option<CarryOver>), ControllerError> {
        let (lens, device) = self.resolve_device(lens, position)?;

        let carry = {
            let lock = ConfigurationLock::acquire(device.as_ref())
                .map_err(|e| ControllerError::lock_failed(device.id(), e))?;
            lock.set_zoom_factor(1.0);
            lock.set_focus(FocusMode::ContinuousAuto, None);
            lock.set_exposure(ExposureMode::ContinuousAuto, None);
            let carry = match snapshot {
                Some(snapshot) => Some(apply_carry_over(&lock, snapshot)),
                None => {
                    lock.set_white_balance_auto();
                    None
                }
            };
            lock.set_subject_area_monitoring(true);
            carry
        };

        tx.add_input(&device)?;
        Ok((
            ActiveCamera {
                device,
                lens,
                position,
            },
            carry,
        ))
    }

    fn finish_activation(
        &self,
        env: &SwitchEnv<'_>,
        active: &ActiveCamera,
        carry: Option<CarryOver>,
    ) {
        active
            .device
            .set_subject_area_observer(Some(Arc::clone(&env.observer)));
        env.transactions.ensure_running();

        if let Some(CarryOver::ResumeAuto(_)) = carry {
            let device = Arc::clone(&active.device);
            env.scheduler.schedule(
                TimerKey::WhiteBalanceRestore(device.id().clone()),
                self.config.white_balance_restore_delay(),
                move || match ConfigurationLock::acquire(device.as_ref()) {
                    Ok(lock) => {
                        lock.set_white_balance_auto();
                    }
                    Err(e) => {
                        tracing::warn!(device = %device.id(), error = %e, "White-balance resume skipped");
                    }
                },
            );
        }
    }
}
