//! Cancellable scheduled tasks keyed by purpose and device.

use super::lock_unpoisoned;
use crate::device::DeviceId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Identifies a pending task. At most one task is pending per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Return a device to continuous-auto after a tap or scene change.
    FocusReset(DeviceId),
    /// Hide the focus indicator.
    FocusIndicator,
    /// Return carried-over white balance to continuous-auto after a lens switch.
    WhiteBalanceRestore(DeviceId),
}

struct Pending {
    generation: u64,
    abort: AbortHandle,
}

#[derive(Default)]
struct SchedulerState {
    next_generation: u64,
    pending: HashMap<TimerKey, Pending>,
}

/// Schedules one-shot tasks; a new task for a key replaces the pending one.
#[derive(Clone)]
pub struct TaskScheduler {
    handle: Handle,
    state: Arc<Mutex<SchedulerState>>,
}

impl TaskScheduler {
    /// Creates a scheduler on the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    /// Runs `task` after `delay`, invalidating any task pending under `key`.
    ///
    /// A replaced task never runs, even if its delay already elapsed and it
    /// is waiting to be polled.
    pub fn schedule<F>(&self, key: TimerKey, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = lock_unpoisoned(&self.state);
        state.next_generation += 1;
        let generation = state.next_generation;

        if let Some(previous) = state.pending.remove(&key) {
            previous.abort.abort();
            tracing::trace!(?key, "Replaced pending task");
        }

        let shared = Arc::clone(&self.state);
        let task_key = key.clone();
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let current = {
                let mut state = lock_unpoisoned(&shared);
                match state.pending.get(&task_key) {
                    Some(pending) if pending.generation == generation => {
                        state.pending.remove(&task_key);
                        true
                    }
                    _ => false,
                }
            };
            if current {
                tracing::trace!(key = ?task_key, "Scheduled task fired");
                task();
            }
        });

        state.pending.insert(
            key,
            Pending {
                generation,
                abort: join.abort_handle(),
            },
        );
    }

    /// Cancels the task pending under `key`. Returns true if one was pending.
    pub fn cancel(&self, key: &TimerKey) -> bool {
        match lock_unpoisoned(&self.state).pending.remove(key) {
            Some(pending) => {
                pending.abort.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels every pending task.
    pub fn cancel_all(&self) {
        let mut state = lock_unpoisoned(&self.state);
        for (_, pending) in state.pending.drain() {
            pending.abort.abort();
        }
    }

    /// Whether a task is pending under `key`.
    pub fn is_pending(&self, key: &TimerKey) -> bool {
        lock_unpoisoned(&self.state).pending.contains_key(key)
    }

    /// Number of pending tasks.
    pub fn pending_count(&self) -> usize {
        lock_unpoisoned(&self.state).pending.len()
    }
}
