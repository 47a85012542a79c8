//! Persistence collaborator interface.

use crate::device::CameraPosition;

/// Receives captured images. Owns encryption and storage.
pub trait PhotoSink: Send + Sync {
    /// Takes ownership of a captured image with its orientation code.
    fn deliver_captured_image(&self, bytes: Vec<u8>, orientation_code: u32, position: CameraPosition);
}
