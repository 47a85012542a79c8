//! Background worker for hardware reconfiguration.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Runs blocking hardware work off the UI-bound thread.
#[derive(Debug, Clone)]
pub struct Worker {
    handle: Handle,
}

impl Worker {
    /// Creates a worker on the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Runs `job` on the blocking pool.
    pub fn run<F, R>(&self, name: &'static str, job: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        tracing::debug!(job = name, "Dispatching to worker");
        let span = tracing::debug_span!("worker", job = name);
        self.handle.spawn_blocking(move || span.in_scope(job))
    }

    /// The runtime the worker dispatches to.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}
