//! Latching manual-reset event
//!
//! The framework's primary signalling primitive: set exactly once per
//! lifecycle, observable by any number of waiters, reset explicitly at
//! start. Built as a condition variable paired with a boolean.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A latching binary event with manual reset.
///
/// Once set, the event stays set until `reset` is called. Waiters blocked
/// in `wait`/`wait_timeout` are released by `set` and by any later
/// observation while the event is set.
#[derive(Debug)]
pub struct Event {
    state: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    /// Create an event in the given initial state.
    pub fn new(initially_set: bool) -> Self {
        Self {
            state: Mutex::new(initially_set),
            cond: Condvar::new(),
        }
    }

    // The guarded state is a plain bool, so a poisoned lock cannot hold a
    // torn value. Recover the guard instead of propagating.
    fn lock_state(&self) -> MutexGuard<'_, bool> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latch the event and release all waiters.
    pub fn set(&self) {
        let mut set = self.lock_state();
        *set = true;
        self.cond.notify_all();
    }

    /// Clear the latch.
    pub fn reset(&self) {
        let mut set = self.lock_state();
        *set = false;
    }

    /// Observe the latch without blocking.
    pub fn is_set(&self) -> bool {
        *self.lock_state()
    }

    /// Block until the event is set.
    pub fn wait(&self) {
        let mut set = self.lock_state();
        while !*set {
            set = self
                .cond
                .wait(set)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the event is set or the timeout elapses.
    ///
    /// Returns true iff the event was set when the wait ended.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut set = self.lock_state();
        while !*set {
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(set, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            set = guard;
        }
        true
    }
}
