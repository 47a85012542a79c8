//! Hardware traits implemented by a platform backend.
//!
//! Device property setters are raw: they must only be called while the
//! device's configuration lock is held. The controllers never call them
//! directly and go through [`ConfigurationLock`](super::ConfigurationLock)
//! instead.

use super::capability::DeviceCapability;
use super::types::{
    CameraPosition, DeviceId, ExposureMode, FocusMode, LensType, NormalizedPoint,
    WhiteBalanceGains, WhiteBalanceMode,
};
use crate::capture::{CapturedPhoto, FlashMode, PhotoSettings};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by hardware implementations.
#[derive(Debug, Clone, Error)]
pub enum HardwareError {
    #[error("configuration lock unavailable for {0}")]
    LockUnavailable(DeviceId),
    #[error("session rejected input {0}")]
    InputRejected(DeviceId),
    #[error("session rejected photo output")]
    OutputRejected,
    #[error("device disconnected: {0}")]
    DeviceDisconnected(DeviceId),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

/// Callback invoked by a device when it reports a scene change.
pub type SubjectAreaCallback = Arc<dyn Fn() + Send + Sync>;

/// Completion handler for an asynchronous photo capture.
pub type CaptureCompletion = Box<dyn FnOnce(Result<CapturedPhoto, HardwareError>) + Send>;

/// A physical camera unit.
pub trait CaptureDevice: Send + Sync {
    /// Stable identity of the unit.
    fn id(&self) -> &DeviceId;

    /// Lens type of the unit.
    fn lens(&self) -> LensType;

    /// Assembly the unit belongs to.
    fn position(&self) -> CameraPosition;

    /// Queried capability set.
    fn capability(&self) -> &DeviceCapability;

    /// Acquires exclusive access for property writes.
    fn lock_for_configuration(&self) -> Result<(), HardwareError>;

    /// Releases exclusive access.
    fn unlock_for_configuration(&self);

    /// Current focus mode.
    fn focus_mode(&self) -> FocusMode;

    /// Current exposure mode.
    fn exposure_mode(&self) -> ExposureMode;

    /// Current white-balance mode.
    fn white_balance_mode(&self) -> WhiteBalanceMode;

    /// Gains currently applied by the white-balance pipeline.
    fn white_balance_gains(&self) -> WhiteBalanceGains;

    /// Current native zoom factor.
    fn zoom_factor(&self) -> f64;

    /// Writes the native zoom factor.
    fn set_zoom_factor(&self, factor: f64);

    /// Writes the focus mode.
    fn set_focus_mode(&self, mode: FocusMode);

    /// Writes the focus point of interest.
    fn set_focus_point_of_interest(&self, point: NormalizedPoint);

    /// Writes the exposure mode.
    fn set_exposure_mode(&self, mode: ExposureMode);

    /// Writes the exposure point of interest.
    fn set_exposure_point_of_interest(&self, point: NormalizedPoint);

    /// Writes the white-balance mode.
    fn set_white_balance_mode(&self, mode: WhiteBalanceMode);

    /// Locks white balance at explicit gains.
    fn set_white_balance_locked_with_gains(&self, gains: WhiteBalanceGains);

    /// Enables or disables subject-area change monitoring.
    fn set_subject_area_change_monitoring(&self, enabled: bool);

    /// Registers (or, with `None`, removes) the subject-area observer.
    fn set_subject_area_observer(&self, observer: Option<SubjectAreaCallback>);
}

/// The capture session owning device inputs and the photo output.
pub trait CaptureSession: Send + Sync {
    /// Opens a configuration batch.
    fn begin_configuration(&self);

    /// Applies and closes the configuration batch.
    fn commit_configuration(&self);

    /// Identities of the attached inputs.
    fn inputs(&self) -> Vec<DeviceId>;

    /// Attaches a device as input.
    fn add_input(&self, device: &Arc<dyn CaptureDevice>) -> Result<(), HardwareError>;

    /// Detaches a device input.
    fn remove_input(&self, device: &DeviceId);

    /// Attaches the photo output if not already attached.
    fn add_photo_output(&self) -> Result<(), HardwareError>;

    /// Whether frames are flowing.
    fn is_running(&self) -> bool;

    /// Starts the frame flow.
    fn start_running(&self);

    /// Stops the frame flow.
    fn stop_running(&self);
}

/// Still-photo output attached to the session.
pub trait PhotoOutput: Send + Sync {
    /// Flash modes the output currently supports.
    fn supported_flash_modes(&self) -> Vec<FlashMode>;

    /// Issues a capture; `completion` runs on a background thread.
    fn capture_photo(&self, settings: PhotoSettings, completion: CaptureCompletion);
}

/// Looks up physical devices by lens and position.
pub trait DeviceDiscovery: Send + Sync {
    /// Returns the device for the pair, if the hardware has one.
    fn device(&self, lens: LensType, position: CameraPosition) -> Option<Arc<dyn CaptureDevice>>;
}
