//! Serialized hardware reconfiguration.
//!
//! Two locking levels are held correctly nested during a lens or position
//! switch: the session transaction outermost, a device configuration lock
//! innermost. The [`ConfiguringGuard`] keeps switches from overlapping.
//! Reconfiguration runs on the [`Worker`]; observable state is written only
//! by the [`StatePublisher`] task.

mod guard;
mod publisher;
mod scheduler;
mod transaction;
mod worker;

pub use guard::{ConfiguringGuard, ConfiguringToken};
pub use publisher::{CameraState, StatePublisher, StateUpdate};
pub use scheduler::{TaskScheduler, TimerKey};
pub use transaction::{SessionTransaction, SessionTransactionManager};
pub use worker::Worker;

use std::sync::{
    Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError,
};

/// Locks a mutex, recovering the data if a previous holder panicked.
///
/// A panic mid-switch must never leave the controller wedged.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Takes a shared lock without waiting, recovering a poisoned lock.
///
/// Returns `None` while an exclusive holder is active.
pub(crate) fn try_read_unpoisoned<T>(lock: &RwLock<T>) -> Option<RwLockReadGuard<'_, T>> {
    match lock.try_read() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

/// Takes an exclusive lock, recovering a poisoned lock.
pub(crate) fn write_unpoisoned<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
