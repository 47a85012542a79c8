//! Reentrancy guard for lens and position switches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set for the whole duration of a lens/position switch.
///
/// The first switch completes uncontested; any request arriving while the
/// guard is held is dropped.
#[derive(Debug, Clone, Default)]
pub struct ConfiguringGuard {
    flag: Arc<AtomicBool>,
}

impl ConfiguringGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the guard, or returns `None` if a switch is in progress.
    pub fn try_acquire(&self) -> Option<ConfiguringToken> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ConfiguringToken {
                flag: Arc::clone(&self.flag),
            })
    }

    /// Whether a switch is in progress.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Proof of holding the [`ConfiguringGuard`]; clears it when dropped.
#[derive(Debug)]
pub struct ConfiguringToken {
    flag: Arc<AtomicBool>,
}

impl Drop for ConfiguringToken {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
