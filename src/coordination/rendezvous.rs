//! Graceful-shutdown rendezvous shared by a group of workers
//!
//! Worker threads announce themselves as they start. When a thread leaves
//! its run loop it votes on whether it is stopping cleanly (a stop request)
//! or not (a failed tick or a panicked hook). Cleanly-stopping threads then
//! hold at two barriers: first until every peer has voted, then, after
//! their stop-imminent work, until every peer is ready to stop. A single
//! unclean vote releases the first barrier immediately with a false result
//! so no thread lingers in a graceful shutdown that a peer has declined.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Granularity of the barrier waits. Arrival notifications release the
/// barriers promptly; the timeout is a backstop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct RendezvousState {
    started: usize,
    ready_to_stop: usize,
    clean_votes: Vec<bool>,
}

/// Rendezvous point for the shutdown of a worker group.
///
/// Counts participants rather than taking a fixed size: the set of workers
/// is chosen at start time. Must outlive every participating worker.
#[derive(Debug)]
pub struct ShutdownRendezvous {
    state: Mutex<RendezvousState>,
    cond: Condvar,
    poll_interval: Duration,
}

impl Default for ShutdownRendezvous {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownRendezvous {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            state: Mutex::new(RendezvousState::default()),
            cond: Condvar::new(),
            poll_interval,
        }
    }

    // Counts and votes stay consistent across a recovered poison because
    // every mutation is a single push or increment.
    fn lock_state(&self) -> MutexGuard<'_, RendezvousState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Zero the counts and clear the votes.
    ///
    /// Caller responsibility: no participant thread is alive.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        state.started = 0;
        state.ready_to_stop = 0;
        state.clean_votes.clear();
    }

    /// Record one participant's arrival.
    pub fn announce_started(&self) {
        let mut state = self.lock_state();
        state.started += 1;
    }

    /// Record one participant's clean/unclean shutdown vote.
    pub fn submit_clean_vote(&self, clean: bool) {
        let mut state = self.lock_state();
        debug_assert!(state.clean_votes.len() < state.started);
        state.clean_votes.push(clean);
        self.cond.notify_all();
    }

    /// Hold until every participant has voted.
    ///
    /// Returns false as soon as any recorded vote is unclean, without
    /// waiting for the remaining votes; true once all votes are in and all
    /// are clean.
    pub fn await_all_clean_votes(&self) -> bool {
        let mut state = self.lock_state();
        loop {
            if state.clean_votes.iter().any(|clean| !clean) {
                return false;
            }
            if state.clean_votes.len() == state.started {
                return true;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(state, self.poll_interval)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Record that one participant has finished its stop-imminent work.
    pub fn announce_ready_to_stop(&self) {
        let mut state = self.lock_state();
        debug_assert!(state.ready_to_stop < state.started);
        state.ready_to_stop += 1;
        self.cond.notify_all();
    }

    /// Hold until every participant is ready to stop.
    pub fn await_all_ready_to_stop(&self) {
        let mut state = self.lock_state();
        while state.ready_to_stop != state.started {
            let (guard, _) = self
                .cond
                .wait_timeout(state, self.poll_interval)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }
}
