//! The capture façade the UI layer talks to.
//!
//! ```text
//! UI event ──► CaptureCoordinator ──► Zoom / Focus / LensSelector
//!                    │                        │
//!                    │                        ▼
//!                    │              SessionTransactionManager (worker)
//!                    ▼
//!             StatePublisher ──► watch::Receiver<CameraState> (UI)
//! ```
//!
//! Zoom and tap-to-focus are synchronous and cheap (one device lock).
//! Setup, switches and shutdown run on the worker and hand back a
//! `JoinHandle`. While a switch runs the outgoing device is retired: zoom,
//! focus and capture requests are dropped until it completes.

use super::geometry::{DisplayPoint, PreviewGeometry};
use super::settings::{CapturedPhoto, DeviceOrientation, FlashMode, PhotoSettings};
use super::sink::PhotoSink;
use crate::config::ControllerConfig;
use crate::device::{
    CameraPosition, CaptureSession, DeviceDiscovery, HardwareError, LensType, PhotoOutput,
    SubjectAreaCallback,
};
use crate::error::ControllerError;
use crate::focus::{FocusExposureController, FocusRequest};
use crate::lens::{ActiveCamera, LensSelector, SwitchEnv, SwitchOutcome, SwitchRequest};
use crate::metrics::MetricsRegistry;
use crate::session::{
    lock_unpoisoned, try_read_unpoisoned, write_unpoisoned, CameraState, ConfiguringToken,
    SessionTransactionManager, StatePublisher, StateUpdate, TaskScheduler, TimerKey, Worker,
};
use crate::zoom::{ZoomController, ZoomRange};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Platform hardware the coordinator drives.
pub struct HardwareParts {
    /// Capture session.
    pub session: Arc<dyn CaptureSession>,
    /// Device lookup.
    pub discovery: Arc<dyn DeviceDiscovery>,
    /// Still-photo output.
    pub photo_output: Arc<dyn PhotoOutput>,
}

struct Core {
    config: ControllerConfig,
    worker: Worker,
    scheduler: TaskScheduler,
    transactions: SessionTransactionManager,
    selector: LensSelector,
    zoom: Mutex<ZoomController>,
    focus: FocusExposureController,
    publisher: StatePublisher,
    photo_output: Arc<dyn PhotoOutput>,
    sink: Arc<dyn PhotoSink>,
    metrics: Arc<MetricsRegistry>,
    geometry: Mutex<PreviewGeometry>,
    orientation: Mutex<DeviceOrientation>,
    flash: Mutex<FlashMode>,
    /// Shared by requests acting on the active device, exclusive for worker
    /// jobs that replace or detach it.
    retirement: RwLock<()>,
}

/// A request admitted against the active camera.
///
/// Worker jobs wait for every admitted request to finish before they touch
/// the session, so nothing reaches a device after it has been detached.
struct InFlight<'a> {
    active: ActiveCamera,
    _retirement: RwLockReadGuard<'a, ()>,
}

/// Publishes the settled camera state and clears the configuring guard
/// when a worker job ends, however it ends.
struct SwitchCompletion<'a> {
    core: &'a Core,
    finished: bool,
    _token: ConfiguringToken,
}

impl Drop for SwitchCompletion<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.core.metrics.record_abort();
            tracing::error!("Camera reconfiguration panicked; guard released");
        }
        self.core.publish_active();
        self.core
            .publisher
            .publish(StateUpdate::Running(self.core.transactions.session().is_running()));
        self.core.publisher.publish(StateUpdate::Configuring(false));
    }
}

impl Core {
    fn observer(self: &Arc<Self>) -> SubjectAreaCallback {
        let core = Arc::downgrade(self);
        Arc::new(move || {
            if let Some(core) = core.upgrade() {
                core.subject_area_changed();
            }
        })
    }

    fn switch_env(self: &Arc<Self>) -> SwitchEnv<'_> {
        SwitchEnv {
            transactions: &self.transactions,
            scheduler: &self.scheduler,
            observer: self.observer(),
        }
    }

    /// Adopts the zoom range of a newly active camera.
    fn adopt(&self, outcome: &SwitchOutcome) {
        let mut zoom = lock_unpoisoned(&self.zoom);
        zoom.reset(outcome.range, 1.0);
        self.metrics.set_zoom(zoom.current());
    }

    fn publish_active(&self) {
        let Some(active) = self.selector.active() else {
            return;
        };
        let (range, current) = {
            let zoom = lock_unpoisoned(&self.zoom);
            (zoom.range(), zoom.current())
        };
        self.publisher.publish(StateUpdate::ActiveCamera {
            lens: active.lens,
            position: active.position,
            min_zoom: range.min(),
            max_zoom: range.max(),
            zoom: current,
        });
    }

    /// Admits a request against the active camera, unless it is being
    /// switched out or the session is stopped.
    fn admit(&self, action: &str) -> Option<InFlight<'_>> {
        let gate = if self.selector.is_configuring() {
            None
        } else {
            try_read_unpoisoned(&self.retirement)
        };
        // Re-checked under the gate: a job may have claimed the guard meanwhile.
        let Some(gate) = gate.filter(|_| !self.selector.is_configuring()) else {
            tracing::trace!(action, "Reconfiguration in progress; request dropped");
            return None;
        };
        let Some(active) = self.selector.active() else {
            tracing::debug!(action, "No active camera; request dropped");
            return None;
        };
        Some(InFlight {
            active,
            _retirement: gate,
        })
    }

    fn subject_area_changed(&self) {
        let Some(request) = self.admit("subject-area") else {
            return;
        };
        if self.focus.subject_area_changed(&request.active.device).is_err() {
            self.metrics.record_lock_failure();
        }
    }
}

/// Top-level camera controller, constructed once by the composition root.
pub struct CaptureCoordinator {
    core: Arc<Core>,
}

impl CaptureCoordinator {
    /// Wires the controllers over the given hardware.
    ///
    /// `runtime` hosts the worker pool, the state publisher and the timers.
    pub fn new(
        hardware: HardwareParts,
        sink: Arc<dyn PhotoSink>,
        config: ControllerConfig,
        runtime: Handle,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let metrics = Arc::new(MetricsRegistry::new()?);
        let scheduler = TaskScheduler::new(runtime.clone());

        let core = Core {
            worker: Worker::new(runtime.clone()),
            transactions: SessionTransactionManager::new(hardware.session),
            selector: LensSelector::new(hardware.discovery, config.clone()),
            zoom: Mutex::new(ZoomController::new(ZoomRange::new(1.0, 1.0, 1.0), &config)),
            focus: FocusExposureController::new(config.clone(), scheduler.clone()),
            publisher: StatePublisher::spawn(&runtime, CameraState::default()),
            photo_output: hardware.photo_output,
            sink,
            metrics,
            geometry: Mutex::new(PreviewGeometry::default()),
            orientation: Mutex::new(DeviceOrientation::Portrait),
            flash: Mutex::new(FlashMode::Off),
            retirement: RwLock::new(()),
            scheduler,
            config,
        };
        Ok(Self {
            core: Arc::new(core),
        })
    }

    /// Configures the default camera and starts the session on the worker.
    ///
    /// Returns `None` if a reconfiguration is already running or a camera is
    /// already attached.
    pub fn start(&self) -> Option<JoinHandle<Result<(), ControllerError>>> {
        let Some(token) = self.core.selector.guard().try_acquire() else {
            tracing::debug!("Reconfiguration in progress; start dropped");
            return None;
        };
        if self.core.selector.active().is_some() {
            tracing::debug!("Session already started; start dropped");
            return None;
        }
        self.core.publisher.publish(StateUpdate::Configuring(true));

        let core = Arc::clone(&self.core);
        Some(self.core.worker.run("initial-setup", move || {
            let mut completion = SwitchCompletion {
                core: &core,
                finished: false,
                _token: token,
            };
            let _retired = write_unpoisoned(&core.retirement);
            let result = core.selector.activate_initial(&core.switch_env());
            completion.finished = true;
            match &result {
                Ok(outcome) => core.adopt(outcome),
                Err(e) => tracing::warn!(error = %e, "Camera setup failed"),
            }
            result.map(|_| ())
        }))
    }

    /// Detaches the camera, stops the session and cancels every pending timer.
    ///
    /// Requests are dropped until the next [`CaptureCoordinator::start`].
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let Some(token) = self.core.selector.guard().try_acquire() else {
            tracing::debug!("Reconfiguration in progress; stop dropped");
            return None;
        };

        let core = Arc::clone(&self.core);
        Some(self.core.worker.run("stop", move || {
            let mut completion = SwitchCompletion {
                core: &core,
                finished: false,
                _token: token,
            };
            let _retired = write_unpoisoned(&core.retirement);
            core.scheduler.cancel_all();
            if let Some(retired) = core.selector.deactivate(&core.transactions) {
                core.focus.retire(retired.device.id());
            }
            core.transactions.session().stop_running();
            core.publisher.publish(StateUpdate::FocusIndicator(None));
            completion.finished = true;
            tracing::info!("Capture session stopped");
        }))
    }

    /// Pinch gesture frame.
    pub fn on_pinch(&self, scale: f64, is_gesture_start: bool) {
        let Some(request) = self.core.admit("pinch") else {
            return;
        };
        let mut zoom = lock_unpoisoned(&self.core.zoom);
        let target = zoom.pinch_target(scale, is_gesture_start);

        if let Some(lens) = self.core.selector.zoom_driven_lens(target) {
            drop(zoom);
            tracing::debug!(target, ?lens, "Zoom crossed lens threshold");
            self.switch_lens(lens);
            return;
        }
        self.apply_zoom(&mut zoom, &request.active, target);
    }

    /// Moves the zoom toward a user-facing factor.
    pub fn set_zoom(&self, factor: f64) {
        let Some(request) = self.core.admit("zoom") else {
            return;
        };
        let mut zoom = lock_unpoisoned(&self.core.zoom);
        self.apply_zoom(&mut zoom, &request.active, factor);
    }

    fn apply_zoom(&self, zoom: &mut ZoomController, active: &ActiveCamera, target: f64) {
        match zoom.set_target_zoom(active.device.as_ref(), target) {
            Ok(applied) => {
                self.core.publisher.publish(StateUpdate::Zoom(applied));
                self.core.metrics.set_zoom(applied);
            }
            Err(_) => self.core.metrics.record_lock_failure(),
        }
    }

    /// Single tap: focus and expose at the point.
    pub fn on_single_tap(&self, point: DisplayPoint) {
        self.tap(point, false);
    }

    /// Double tap: focus, expose and lock white balance at the point.
    pub fn on_double_tap(&self, point: DisplayPoint) {
        self.tap(point, true);
    }

    fn tap(&self, point: DisplayPoint, lock_white_balance: bool) {
        let Some(request) = self.core.admit("tap") else {
            return;
        };
        let active = &request.active;
        let geometry = *lock_unpoisoned(&self.core.geometry);
        let device_point = geometry.to_device(point);

        // A tap supersedes any pending carry-over resume.
        self.core
            .scheduler
            .cancel(&TimerKey::WhiteBalanceRestore(active.device.id().clone()));

        let focus_request = FocusRequest::new(device_point, lock_white_balance);
        if self.core.focus.tap(&active.device, &focus_request).is_err() {
            self.core.metrics.record_lock_failure();
            return;
        }

        let indicator = geometry.to_display(device_point);
        self.core
            .publisher
            .publish(StateUpdate::FocusIndicator(Some(indicator)));
        let publisher = self.core.publisher.clone();
        self.core.scheduler.schedule(
            TimerKey::FocusIndicator,
            self.core.config.focus_indicator_duration(),
            move || publisher.publish(StateUpdate::FocusIndicator(None)),
        );
    }

    /// Hardware observer entry point for scene changes.
    pub fn on_subject_area_changed(&self) {
        self.core.subject_area_changed();
    }

    /// Swaps front and back cameras.
    pub fn on_toggle_position(&self) -> Option<JoinHandle<()>> {
        let position = self
            .core
            .selector
            .active()
            .map(|a| a.position)
            .unwrap_or(CameraPosition::Back);
        self.switch_position(position.toggled())
    }

    /// Swaps ultra-wide and wide-angle on the back camera.
    pub fn on_toggle_lens(&self) -> Option<JoinHandle<()>> {
        let active = self.core.selector.active()?;
        if active.position == CameraPosition::Front {
            tracing::debug!("Front camera has a single lens; toggle ignored");
            return None;
        }
        let lens = match active.lens {
            LensType::UltraWide => LensType::WideAngle,
            LensType::WideAngle => LensType::UltraWide,
        };
        self.switch_lens(lens)
    }

    /// Switches lens on the current position.
    pub fn switch_lens(&self, lens: LensType) -> Option<JoinHandle<()>> {
        self.request_switch(SwitchRequest::Lens(lens))
    }

    /// Switches camera position.
    pub fn switch_position(&self, position: CameraPosition) -> Option<JoinHandle<()>> {
        self.request_switch(SwitchRequest::Position(position))
    }

    fn request_switch(&self, request: SwitchRequest) -> Option<JoinHandle<()>> {
        let selector = &self.core.selector;
        let Some(token) = selector.begin_switch(request) else {
            if selector.is_configuring() {
                self.core.metrics.record_dropped_switch();
            }
            return None;
        };

        let (lens, position) = selector.target_of(request);
        self.core
            .publisher
            .publish(StateUpdate::PendingCamera { lens, position });
        self.core.publisher.publish(StateUpdate::Configuring(true));

        let core = Arc::clone(&self.core);
        Some(self.core.worker.run("switch", move || {
            let mut completion = SwitchCompletion {
                core: &core,
                finished: false,
                _token: token,
            };
            // The outgoing device is retired once admitted requests drain.
            let _retired = write_unpoisoned(&core.retirement);
            if let Some(outgoing) = core.selector.active() {
                core.focus.retire(outgoing.device.id());
                core.scheduler
                    .cancel(&TimerKey::WhiteBalanceRestore(outgoing.device.id().clone()));
            }
            let result = core.selector.run_switch(&core.switch_env(), request);
            completion.finished = true;
            match result {
                Ok(outcome) => {
                    core.adopt(&outcome);
                    core.metrics.record_switch();
                }
                Err(e) => {
                    core.metrics.record_abort();
                    tracing::warn!(?request, error = %e, "Switch aborted");
                }
            }
        }))
    }

    /// Issues a still capture. Returns false if nothing was issued.
    ///
    /// The photo reaches the [`PhotoSink`] from the output's completion
    /// callback, on a background thread.
    pub fn on_capture(&self) -> bool {
        let Some(request) = self.core.admit("capture") else {
            return false;
        };
        let active = &request.active;
        let flash = *lock_unpoisoned(&self.core.flash);
        let orientation = *lock_unpoisoned(&self.core.orientation);
        let settings = PhotoSettings::for_capture(
            active.position,
            flash,
            &self.core.photo_output.supported_flash_modes(),
            orientation,
        );
        tracing::info!(
            device = %active.device.id(),
            flash = ?settings.flash,
            rotation = settings.rotation_degrees,
            "Capturing photo"
        );

        let sink = Arc::clone(&self.core.sink);
        let metrics = Arc::clone(&self.core.metrics);
        let position = active.position;
        let issued = settings.clone();
        self.core.photo_output.capture_photo(
            settings,
            Box::new(move |result: Result<CapturedPhoto, HardwareError>| match result {
                Ok(photo) => {
                    let orientation_code = photo.orientation_code(&issued);
                    sink.deliver_captured_image(photo.data, orientation_code, position);
                    metrics.record_capture();
                }
                Err(e) => {
                    metrics.record_capture_failure();
                    tracing::warn!(error = %e, "Photo capture failed");
                }
            }),
        );
        true
    }

    /// Advances the flash mode `Off → Auto → On → Off`.
    pub fn on_flash_cycle(&self) -> FlashMode {
        let mut flash = lock_unpoisoned(&self.core.flash);
        *flash = flash.next();
        self.core.publisher.publish(StateUpdate::Flash(*flash));
        *flash
    }

    /// Sets the flash mode directly.
    pub fn set_flash_mode(&self, mode: FlashMode) {
        *lock_unpoisoned(&self.core.flash) = mode;
        self.core.publisher.publish(StateUpdate::Flash(mode));
    }

    /// Records the handset orientation; flat or unknown readings are ignored.
    pub fn set_device_orientation(&self, orientation: DeviceOrientation) {
        if orientation.is_horizon_relevant() {
            *lock_unpoisoned(&self.core.orientation) = orientation;
        }
    }

    /// Records the preview surface size used for tap mapping.
    pub fn set_preview_size(&self, width: f64, height: f64) {
        *lock_unpoisoned(&self.core.geometry) = PreviewGeometry::new(width, height);
    }

    /// Subscribes to published state.
    pub fn subscribe(&self) -> watch::Receiver<CameraState> {
        self.core.publisher.subscribe()
    }

    /// Latest published state.
    pub fn state(&self) -> CameraState {
        self.core.publisher.snapshot()
    }

    /// Resolves once every update issued so far has been published.
    pub async fn flush(&self) {
        self.core.publisher.flush().await;
    }

    /// The active camera.
    pub fn active_camera(&self) -> Option<ActiveCamera> {
        self.core.selector.active()
    }

    /// Whether a reconfiguration is running.
    pub fn is_configuring(&self) -> bool {
        self.core.selector.is_configuring()
    }

    /// Focus/exposure controller, for inspection.
    pub fn focus(&self) -> &FocusExposureController {
        &self.core.focus
    }

    /// Controller metrics.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.core.metrics
    }

    /// Effective configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.core.config
    }
}
