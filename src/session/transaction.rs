//! RAII session transactions.

use crate::device::{CaptureDevice, CaptureSession, DeviceId, HardwareError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Brackets every input/output mutation in begin/commit.
pub struct SessionTransactionManager {
    session: Arc<dyn CaptureSession>,
    open: AtomicBool,
}

impl SessionTransactionManager {
    /// Wraps a capture session.
    pub fn new(session: Arc<dyn CaptureSession>) -> Self {
        Self {
            session,
            open: AtomicBool::new(false),
        }
    }

    /// Opens a transaction.
    ///
    /// # Panics
    ///
    /// If a transaction is already open on this session. Switches are
    /// serialized by the configuring guard, so this is a programmer error.
    pub fn begin(&self) -> SessionTransaction<'_> {
        let already_open = self
            .open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err();
        assert!(!already_open, "session transaction already open");

        self.session.begin_configuration();
        tracing::debug!("Session transaction opened");
        SessionTransaction { manager: self }
    }

    /// Whether a transaction is currently open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// The wrapped session, for calls that need no transaction.
    pub fn session(&self) -> &Arc<dyn CaptureSession> {
        &self.session
    }

    /// Starts the session if it is not already running.
    pub fn ensure_running(&self) {
        if !self.session.is_running() {
            self.session.start_running();
            tracing::info!("Capture session started");
        }
    }
}

/// An open begin/commit bracket. Commits when dropped, on every exit path.
pub struct SessionTransaction<'a> {
    manager: &'a SessionTransactionManager,
}

impl SessionTransaction<'_> {
    /// Attaches a device input.
    pub fn add_input(&self, device: &Arc<dyn CaptureDevice>) -> Result<(), HardwareError> {
        self.manager.session.add_input(device)
    }

    /// Detaches a device input.
    pub fn remove_input(&self, device: &DeviceId) {
        self.manager.session.remove_input(device);
    }

    /// Attaches the photo output.
    pub fn add_photo_output(&self) -> Result<(), HardwareError> {
        self.manager.session.add_photo_output()
    }

    /// Commits explicitly.
    pub fn commit(self) {}
}

impl Drop for SessionTransaction<'_> {
    fn drop(&mut self) {
        self.manager.session.commit_configuration();
        self.manager.open.store(false, Ordering::Release);
        tracing::debug!("Session transaction committed");
    }
}
