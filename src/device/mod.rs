//! Physical camera units and the hardware seams the controller drives.
//!
//! Everything below the controller is expressed as traits so that a
//! platform backend and the in-crate mocks are interchangeable:
//!
//! ```text
//! DeviceDiscovery ──► CaptureDevice ──► ConfigurationLock (RAII)
//! CaptureSession  ──► inputs / outputs (mutated inside transactions)
//! PhotoOutput     ──► asynchronous capture completion
//! ```

mod capability;
mod hardware;
mod lock;
pub mod mock;
mod types;

pub use capability::{DeviceCapability, PhotoDimensions};
pub use hardware::{
    CaptureCompletion, CaptureDevice, CaptureSession, DeviceDiscovery, HardwareError, PhotoOutput,
    SubjectAreaCallback,
};
pub use lock::ConfigurationLock;
pub use types::{
    CameraPosition, DeviceId, ExposureMode, FocusMode, LensType, NormalizedPoint,
    WhiteBalanceGains, WhiteBalanceMode,
};
