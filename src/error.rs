//! Controller error taxonomy.
//!
//! None of these reach the end user synchronously; the UI-facing entry
//! points log them and carry on.

use crate::config::ConfigError;
use crate::device::{CameraPosition, DeviceId, HardwareError, LensType};
use crate::metrics::MetricsError;
use thiserror::Error;

/// Errors raised while driving the capture hardware.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// No physical device matches the requested lens and position.
    #[error("no device for {lens:?} on the {position:?} camera")]
    DeviceUnavailable {
        lens: LensType,
        position: CameraPosition,
    },
    /// The device configuration lock could not be acquired. Transient.
    #[error("configuration lock failed for {0}")]
    ConfigurationLockFailed(DeviceId),
    /// A switch failed midway; the transaction was still committed.
    #[error("transaction aborted: {0}")]
    TransactionAbort(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl ControllerError {
    /// Maps a lock acquisition failure to the transient lock error.
    pub(crate) fn lock_failed(device: &DeviceId, err: HardwareError) -> Self {
        tracing::warn!(device = %device, error = %err, "Configuration lock failed");
        ControllerError::ConfigurationLockFailed(device.clone())
    }
}
