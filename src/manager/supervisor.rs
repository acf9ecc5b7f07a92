//! Worker group supervision
//!
//! The supervisor owns the pieces a controller needs to run a set of peer
//! workers as one unit: the group stop flag (the external flag every
//! worker watches) and the shutdown rendezvous they share. Stopping the
//! group always raises the shared flag before joining anyone, so the
//! rendezvous can complete.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::coordination::ShutdownRendezvous;
use crate::error::{Result, TunnlrError};
use crate::worker::event::Event;
use crate::worker::lifecycle::{Worker, WorkerThread};
use crate::worker::stop::StopFlag;

/// Object-safe facade over [`WorkerThread`], so workers with different
/// bodies can live in one group.
pub trait WorkerControl {
    fn name(&self) -> &str;
    fn start(
        &mut self,
        external_stop: &StopFlag,
        rendezvous: Option<Arc<ShutdownRendezvous>>,
    ) -> Result<bool>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
    fn stopped_event(&self) -> Arc<Event>;
}

impl<W: Worker + Send + 'static> WorkerControl for WorkerThread<W> {
    fn name(&self) -> &str {
        WorkerThread::name(self)
    }

    fn start(
        &mut self,
        external_stop: &StopFlag,
        rendezvous: Option<Arc<ShutdownRendezvous>>,
    ) -> Result<bool> {
        WorkerThread::start(self, external_stop, rendezvous)
    }

    fn stop(&mut self) {
        WorkerThread::stop(self);
    }

    fn is_running(&self) -> bool {
        WorkerThread::is_running(self)
    }

    fn stopped_event(&self) -> Arc<Event> {
        WorkerThread::stopped_event(self)
    }
}

/// Starts, watches, and stops a group of workers sharing one stop flag
/// and one shutdown rendezvous.
pub struct Supervisor {
    stop_flag: StopFlag,
    rendezvous: Arc<ShutdownRendezvous>,
    workers: Vec<Box<dyn WorkerControl>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self::with_rendezvous(Arc::new(ShutdownRendezvous::new()))
    }

    /// Use a rendezvous with custom tuning (barrier poll interval).
    pub fn with_rendezvous(rendezvous: Arc<ShutdownRendezvous>) -> Self {
        Self {
            stop_flag: StopFlag::new(),
            rendezvous,
            workers: Vec::new(),
        }
    }

    /// A handle onto the group stop flag, e.g. for a signal handler.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop_flag.clone()
    }

    pub fn add(&mut self, worker: impl WorkerControl + 'static) {
        self.workers.push(Box::new(worker));
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn running_count(&self) -> usize {
        self.workers.iter().filter(|w| w.is_running()).count()
    }

    /// Start every worker in order. On the first refusal or failure the
    /// group flag is raised, everything already started is stopped, and
    /// the error is returned.
    pub fn start_all(&mut self) -> Result<()> {
        if self.workers.iter().any(|w| w.is_running()) {
            return Err(TunnlrError::AlreadyRunning);
        }

        self.stop_flag.clear();
        self.rendezvous.reset();

        for index in 0..self.workers.len() {
            let worker = &mut self.workers[index];
            let name = worker.name().to_string();
            let outcome = worker.start(&self.stop_flag, Some(Arc::clone(&self.rendezvous)));

            match outcome {
                Ok(true) => info!("worker {name} started"),
                Ok(false) => {
                    warn!("worker {name} refused to start, stopping the group");
                    self.stop_all();
                    return Err(TunnlrError::StartFailed(name));
                }
                Err(err) => {
                    warn!("worker {name} failed to start: {err}, stopping the group");
                    self.stop_all();
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// Raise the group stop flag without joining anyone.
    pub fn request_stop(&self) {
        self.stop_flag.raise();
    }

    /// Raise the group stop flag, then join every worker. Idempotent.
    pub fn stop_all(&mut self) {
        self.stop_flag.raise();
        for worker in &mut self.workers {
            worker.stop();
        }
    }

    /// Block until every worker's stopped signal is latched.
    pub fn wait_all_stopped(&self) {
        for worker in &self.workers {
            worker.stopped_event().wait();
        }
    }

    /// Like [`Self::wait_all_stopped`], bounded per worker. Returns false
    /// if any worker was still running at its deadline.
    pub fn wait_all_stopped_timeout(&self, per_worker: Duration) -> bool {
        self.workers
            .iter()
            .all(|w| w.stopped_event().wait_timeout(per_worker))
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop_all();
    }
}
