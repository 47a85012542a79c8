//! Mock hardware for tests and the demo binary.
//!
//! Each mock records what the controller did to it and supports failure
//! injection, so tests can check the locking and transaction discipline
//! rather than just the happy path.

use super::capability::DeviceCapability;
use super::hardware::{
    CaptureCompletion, CaptureDevice, CaptureSession, DeviceDiscovery, HardwareError, PhotoOutput,
    SubjectAreaCallback,
};
use super::types::{
    CameraPosition, DeviceId, ExposureMode, FocusMode, LensType, NormalizedPoint,
    WhiteBalanceGains, WhiteBalanceMode,
};
use crate::capture::{CapturedPhoto, FlashMode, PhotoSettings};
use crate::session::lock_unpoisoned;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};

/// A property write observed by a [`MockDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceWrite {
    Zoom(f64),
    FocusMode(FocusMode),
    FocusPoint(NormalizedPoint),
    ExposureMode(ExposureMode),
    ExposurePoint(NormalizedPoint),
    WhiteBalanceMode(WhiteBalanceMode),
    WhiteBalanceLocked(WhiteBalanceGains),
    SubjectAreaMonitoring(bool),
}

#[derive(Debug)]
struct DeviceState {
    locked: bool,
    failing_locks: u32,
    disconnected: bool,
    zoom: f64,
    focus: FocusMode,
    exposure: ExposureMode,
    white_balance: WhiteBalanceMode,
    gains: WhiteBalanceGains,
    auto_gains: WhiteBalanceGains,
    monitoring: bool,
    writes: Vec<DeviceWrite>,
    unlocked_writes: u32,
}

#[derive(Debug, Default)]
struct LockGate {
    held: bool,
    waiters: u32,
}

/// In-memory camera unit.
pub struct MockDevice {
    id: DeviceId,
    lens: LensType,
    position: CameraPosition,
    capability: DeviceCapability,
    state: Mutex<DeviceState>,
    observer: Mutex<Option<SubjectAreaCallback>>,
    gate: (Mutex<LockGate>, Condvar),
}

impl MockDevice {
    /// A unit with a full capability set.
    pub fn new(lens: LensType, position: CameraPosition) -> Self {
        Self::with_capability(lens, position, DeviceCapability::default())
    }

    /// A unit with an explicit capability set.
    pub fn with_capability(
        lens: LensType,
        position: CameraPosition,
        capability: DeviceCapability,
    ) -> Self {
        let focus = if capability.supports_focus_mode(FocusMode::ContinuousAuto) {
            FocusMode::ContinuousAuto
        } else {
            FocusMode::Locked
        };
        Self {
            id: DeviceId::for_unit(lens, position),
            lens,
            position,
            state: Mutex::new(DeviceState {
                locked: false,
                failing_locks: 0,
                disconnected: false,
                zoom: capability.min_zoom_factor,
                focus,
                exposure: ExposureMode::ContinuousAuto,
                white_balance: WhiteBalanceMode::ContinuousAuto,
                gains: WhiteBalanceGains::UNITY,
                auto_gains: WhiteBalanceGains::new(1.9, 1.0, 1.7),
                monitoring: false,
                writes: Vec::new(),
                unlocked_writes: 0,
            }),
            capability,
            observer: Mutex::new(None),
            gate: (Mutex::new(LockGate::default()), Condvar::new()),
        }
    }

    /// Makes the next `count` lock attempts fail.
    pub fn fail_next_locks(&self, count: u32) {
        lock_unpoisoned(&self.state).failing_locks = count;
    }

    /// Blocks every `lock_for_configuration` until [`MockDevice::release_locks`].
    pub fn hold_locks(&self) {
        lock_unpoisoned(&self.gate.0).held = true;
    }

    /// Lets held lock attempts proceed.
    pub fn release_locks(&self) {
        lock_unpoisoned(&self.gate.0).held = false;
        self.gate.1.notify_all();
    }

    /// Number of lock attempts currently blocked by [`MockDevice::hold_locks`].
    pub fn lock_waiters(&self) -> u32 {
        lock_unpoisoned(&self.gate.0).waiters
    }

    /// Marks the unit as detached; every lock attempt fails.
    pub fn disconnect(&self) {
        lock_unpoisoned(&self.state).disconnected = true;
    }

    /// Gains the continuous-auto algorithm converges to.
    pub fn set_auto_gains(&self, gains: WhiteBalanceGains) {
        let mut state = lock_unpoisoned(&self.state);
        state.auto_gains = gains;
        if state.white_balance == WhiteBalanceMode::ContinuousAuto {
            state.gains = gains;
        }
    }

    /// Forces the white-balance state without going through a lock.
    pub fn preset_white_balance(&self, mode: WhiteBalanceMode, gains: WhiteBalanceGains) {
        let mut state = lock_unpoisoned(&self.state);
        state.white_balance = mode;
        state.gains = gains;
    }

    /// Forces the focus mode without going through a lock.
    pub fn preset_focus_mode(&self, mode: FocusMode) {
        lock_unpoisoned(&self.state).focus = mode;
    }

    /// Whether the configuration lock is held.
    pub fn is_locked(&self) -> bool {
        lock_unpoisoned(&self.state).locked
    }

    /// Property writes made without holding the configuration lock.
    pub fn unlocked_writes(&self) -> u32 {
        lock_unpoisoned(&self.state).unlocked_writes
    }

    /// Every property write, in order.
    pub fn writes(&self) -> Vec<DeviceWrite> {
        lock_unpoisoned(&self.state).writes.clone()
    }

    /// Clears the write log.
    pub fn clear_writes(&self) {
        lock_unpoisoned(&self.state).writes.clear();
    }

    /// Whether subject-area monitoring is on.
    pub fn is_monitoring_subject_area(&self) -> bool {
        lock_unpoisoned(&self.state).monitoring
    }

    /// Whether an observer is registered.
    pub fn has_observer(&self) -> bool {
        lock_unpoisoned(&self.observer).is_some()
    }

    /// Simulates a scene change reported by the hardware.
    pub fn trigger_subject_area_change(&self) {
        let observer = lock_unpoisoned(&self.observer).clone();
        if let Some(observer) = observer {
            observer();
        }
    }

    fn record(&self, write: DeviceWrite, apply: impl FnOnce(&mut DeviceState)) {
        let mut state = lock_unpoisoned(&self.state);
        if !state.locked {
            state.unlocked_writes += 1;
        }
        apply(&mut state);
        state.writes.push(write);
    }
}

impl CaptureDevice for MockDevice {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    fn lens(&self) -> LensType {
        self.lens
    }

    fn position(&self) -> CameraPosition {
        self.position
    }

    fn capability(&self) -> &DeviceCapability {
        &self.capability
    }

    fn lock_for_configuration(&self) -> Result<(), HardwareError> {
        {
            let mut gate = lock_unpoisoned(&self.gate.0);
            gate.waiters += 1;
            while gate.held {
                gate = self
                    .gate
                    .1
                    .wait(gate)
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
            }
            gate.waiters -= 1;
        }
        let mut state = lock_unpoisoned(&self.state);
        if state.disconnected {
            return Err(HardwareError::DeviceDisconnected(self.id.clone()));
        }
        if state.failing_locks > 0 {
            state.failing_locks -= 1;
            return Err(HardwareError::LockUnavailable(self.id.clone()));
        }
        if state.locked {
            return Err(HardwareError::LockUnavailable(self.id.clone()));
        }
        state.locked = true;
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        lock_unpoisoned(&self.state).locked = false;
    }

    fn focus_mode(&self) -> FocusMode {
        lock_unpoisoned(&self.state).focus
    }

    fn exposure_mode(&self) -> ExposureMode {
        lock_unpoisoned(&self.state).exposure
    }

    fn white_balance_mode(&self) -> WhiteBalanceMode {
        lock_unpoisoned(&self.state).white_balance
    }

    fn white_balance_gains(&self) -> WhiteBalanceGains {
        lock_unpoisoned(&self.state).gains
    }

    fn zoom_factor(&self) -> f64 {
        lock_unpoisoned(&self.state).zoom
    }

    fn set_zoom_factor(&self, factor: f64) {
        self.record(DeviceWrite::Zoom(factor), |s| s.zoom = factor);
    }

    fn set_focus_mode(&self, mode: FocusMode) {
        self.record(DeviceWrite::FocusMode(mode), |s| s.focus = mode);
    }

    fn set_focus_point_of_interest(&self, point: NormalizedPoint) {
        self.record(DeviceWrite::FocusPoint(point), |_| {});
    }

    fn set_exposure_mode(&self, mode: ExposureMode) {
        self.record(DeviceWrite::ExposureMode(mode), |s| s.exposure = mode);
    }

    fn set_exposure_point_of_interest(&self, point: NormalizedPoint) {
        self.record(DeviceWrite::ExposurePoint(point), |_| {});
    }

    fn set_white_balance_mode(&self, mode: WhiteBalanceMode) {
        self.record(DeviceWrite::WhiteBalanceMode(mode), |s| {
            s.white_balance = mode;
            if mode == WhiteBalanceMode::ContinuousAuto {
                s.gains = s.auto_gains;
            }
        });
    }

    fn set_white_balance_locked_with_gains(&self, gains: WhiteBalanceGains) {
        self.record(DeviceWrite::WhiteBalanceLocked(gains), |s| {
            s.white_balance = WhiteBalanceMode::Locked;
            s.gains = gains;
        });
    }

    fn set_subject_area_change_monitoring(&self, enabled: bool) {
        self.record(DeviceWrite::SubjectAreaMonitoring(enabled), |s| {
            s.monitoring = enabled
        });
    }

    fn set_subject_area_observer(&self, observer: Option<SubjectAreaCallback>) {
        *lock_unpoisoned(&self.observer) = observer;
    }
}

#[derive(Debug, Default)]
struct SessionState {
    open: bool,
    begins: u32,
    commits: u32,
    violations: u32,
    inputs: Vec<DeviceId>,
    photo_output: bool,
    running: bool,
    rejected: HashSet<DeviceId>,
    reject_output: bool,
    panic_on_add_input: bool,
}

/// In-memory capture session that counts discipline violations.
#[derive(Default)]
pub struct MockSession {
    state: Mutex<SessionState>,
    gate: (Mutex<bool>, Condvar),
}

impl MockSession {
    /// An empty, stopped session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks every `begin_configuration` until [`MockSession::release`].
    pub fn hold(&self) {
        *lock_unpoisoned(&self.gate.0) = true;
    }

    /// Lets held configuration batches proceed.
    pub fn release(&self) {
        *lock_unpoisoned(&self.gate.0) = false;
        self.gate.1.notify_all();
    }

    /// Makes `add_input` fail for the device.
    pub fn reject_input(&self, device: DeviceId) {
        lock_unpoisoned(&self.state).rejected.insert(device);
    }

    /// Makes `add_photo_output` fail.
    pub fn reject_photo_output(&self) {
        lock_unpoisoned(&self.state).reject_output = true;
    }

    /// Makes the next `add_input` panic.
    pub fn panic_on_next_add_input(&self) {
        lock_unpoisoned(&self.state).panic_on_add_input = true;
    }

    /// Whether a configuration batch is open.
    pub fn is_configuring(&self) -> bool {
        lock_unpoisoned(&self.state).open
    }

    /// `(begin, commit)` call counts.
    pub fn transaction_counts(&self) -> (u32, u32) {
        let state = lock_unpoisoned(&self.state);
        (state.begins, state.commits)
    }

    /// Mutations outside a batch, nested begins, unmatched commits and
    /// duplicate attachments.
    pub fn violations(&self) -> u32 {
        lock_unpoisoned(&self.state).violations
    }

    /// Whether the photo output is attached.
    pub fn has_photo_output(&self) -> bool {
        lock_unpoisoned(&self.state).photo_output
    }
}

impl CaptureSession for MockSession {
    fn begin_configuration(&self) {
        {
            let mut held = lock_unpoisoned(&self.gate.0);
            while *held {
                held = self
                    .gate
                    .1
                    .wait(held)
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
            }
        }
        let mut state = lock_unpoisoned(&self.state);
        if state.open {
            state.violations += 1;
        }
        state.open = true;
        state.begins += 1;
    }

    fn commit_configuration(&self) {
        let mut state = lock_unpoisoned(&self.state);
        if !state.open {
            state.violations += 1;
        }
        state.open = false;
        state.commits += 1;
    }

    fn inputs(&self) -> Vec<DeviceId> {
        lock_unpoisoned(&self.state).inputs.clone()
    }

    fn add_input(&self, device: &Arc<dyn CaptureDevice>) -> Result<(), HardwareError> {
        let mut state = lock_unpoisoned(&self.state);
        if !state.open {
            state.violations += 1;
        }
        if state.panic_on_add_input {
            state.panic_on_add_input = false;
            drop(state);
            panic!("injected failure adding input {}", device.id());
        }
        if state.rejected.contains(device.id()) {
            return Err(HardwareError::InputRejected(device.id().clone()));
        }
        if state.inputs.contains(device.id()) {
            state.violations += 1;
        }
        state.inputs.push(device.id().clone());
        Ok(())
    }

    fn remove_input(&self, device: &DeviceId) {
        let mut state = lock_unpoisoned(&self.state);
        if !state.open {
            state.violations += 1;
        }
        state.inputs.retain(|id| id != device);
    }

    fn add_photo_output(&self) -> Result<(), HardwareError> {
        let mut state = lock_unpoisoned(&self.state);
        if !state.open {
            state.violations += 1;
        }
        if state.reject_output {
            return Err(HardwareError::OutputRejected);
        }
        if state.photo_output {
            state.violations += 1;
        }
        state.photo_output = true;
        Ok(())
    }

    fn is_running(&self) -> bool {
        lock_unpoisoned(&self.state).running
    }

    fn start_running(&self) {
        lock_unpoisoned(&self.state).running = true;
    }

    fn stop_running(&self) {
        lock_unpoisoned(&self.state).running = false;
    }
}

/// Photo output producing a fixed payload.
pub struct MockPhotoOutput {
    flash_modes: Vec<FlashMode>,
    payload: Vec<u8>,
    exif_orientation: Option<u32>,
    fail: bool,
    last_settings: Mutex<Option<PhotoSettings>>,
}

impl MockPhotoOutput {
    /// Output supporting every flash mode.
    pub fn new() -> Self {
        Self {
            flash_modes: vec![FlashMode::Off, FlashMode::Auto, FlashMode::On],
            payload: vec![0xFF, 0xD8, 0xFF, 0xE0],
            exif_orientation: None,
            fail: false,
            last_settings: Mutex::new(None),
        }
    }

    /// Restricts the supported flash modes.
    pub fn with_flash_modes(mut self, modes: Vec<FlashMode>) -> Self {
        self.flash_modes = modes;
        self
    }

    /// Reports an orientation in the photo metadata.
    pub fn with_exif_orientation(mut self, orientation: u32) -> Self {
        self.exif_orientation = Some(orientation);
        self
    }

    /// Makes every capture fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Settings of the most recent capture.
    pub fn last_settings(&self) -> Option<PhotoSettings> {
        lock_unpoisoned(&self.last_settings).clone()
    }
}

impl Default for MockPhotoOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoOutput for MockPhotoOutput {
    fn supported_flash_modes(&self) -> Vec<FlashMode> {
        self.flash_modes.clone()
    }

    fn capture_photo(&self, settings: PhotoSettings, completion: CaptureCompletion) {
        *lock_unpoisoned(&self.last_settings) = Some(settings);
        let result = if self.fail {
            Err(HardwareError::CaptureFailed("injected capture failure".to_string()))
        } else {
            Ok(CapturedPhoto {
                data: self.payload.clone(),
                exif_orientation: self.exif_orientation,
            })
        };
        std::thread::spawn(move || completion(result));
    }
}

/// Discovery over a mutable set of mock units.
#[derive(Default)]
pub struct MockDiscovery {
    devices: Mutex<HashMap<(LensType, CameraPosition), Arc<MockDevice>>>,
}

impl MockDiscovery {
    /// Empty hardware.
    pub fn new() -> Self {
        Self::default()
    }

    /// Back ultra-wide, back wide-angle and a fixed-focus front camera.
    pub fn standard() -> Self {
        let discovery = Self::new();
        discovery.insert(MockDevice::with_capability(
            LensType::UltraWide,
            CameraPosition::Back,
            DeviceCapability::full(4.0),
        ));
        discovery.insert(MockDevice::with_capability(
            LensType::WideAngle,
            CameraPosition::Back,
            DeviceCapability::full(16.0),
        ));
        discovery.insert(MockDevice::with_capability(
            LensType::WideAngle,
            CameraPosition::Front,
            DeviceCapability::fixed_focus(4.0),
        ));
        discovery
    }

    /// Adds or replaces a unit.
    pub fn insert(&self, device: MockDevice) -> Arc<MockDevice> {
        let device = Arc::new(device);
        lock_unpoisoned(&self.devices)
            .insert((device.lens(), device.position()), Arc::clone(&device));
        device
    }

    /// Removes a unit.
    pub fn remove(&self, lens: LensType, position: CameraPosition) -> Option<Arc<MockDevice>> {
        lock_unpoisoned(&self.devices).remove(&(lens, position))
    }

    /// Concrete handle for inspection.
    pub fn mock(&self, lens: LensType, position: CameraPosition) -> Option<Arc<MockDevice>> {
        lock_unpoisoned(&self.devices).get(&(lens, position)).cloned()
    }
}

impl DeviceDiscovery for MockDiscovery {
    fn device(&self, lens: LensType, position: CameraPosition) -> Option<Arc<dyn CaptureDevice>> {
        self.mock(lens, position)
            .map(|device| device as Arc<dyn CaptureDevice>)
    }
}
