//! Stop flags and their OR-composite
//!
//! A worker watches an ordered set of stop flags: its own internal flag
//! plus the caller-owned external flag. Raising any flag in the set asks
//! the worker to wind down at its next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A raisable boolean shared between a controller and its workers.
///
/// The setter publishes with a release store; workers observe with an
/// acquire load. Clones are handles onto the same flag.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Create a flag in the lowered state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Lower the flag. Legal only while no worker is watching it.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// An ordered collection of stop flags evaluated as a logical OR.
#[derive(Clone, Debug, Default)]
pub struct StopFlagSet {
    flags: Vec<StopFlag>,
}

impl StopFlagSet {
    pub fn new(flags: Vec<StopFlag>) -> Self {
        Self { flags }
    }

    pub fn push(&mut self, flag: StopFlag) {
        self.flags.push(flag);
    }

    /// True iff any flag in the set is raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.flags.iter().any(StopFlag::is_raised)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
