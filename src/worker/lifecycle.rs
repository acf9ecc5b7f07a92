//! Worker lifecycle management
//!
//! A `WorkerThread` owns one dedicated OS thread running an implementer's
//! [`Worker`] hooks as a periodic loop. The framework owns the thread
//! handle, the started/stopped signalling, and the composition of stop
//! flags; implementers supply only the work.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::coordination::ShutdownRendezvous;
use crate::error::{Result, TunnlrError};
use crate::worker::event::Event;
use crate::worker::stop::{StopFlag, StopFlagSet};

/// Sleep between iterations of the run loop. Coarse on purpose: stop
/// requests are observed within one tick, and the loop never spins.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Implementer-supplied hooks for a background activity.
///
/// Hooks run on the worker's dedicated thread. A panic in any hook is
/// caught by the framework and converted into an unclean exit; it never
/// crosses the thread boundary.
pub trait Worker {
    /// Called once at thread entry. Returning false abandons the run
    /// without the worker ever reporting as started.
    fn setup(&mut self) -> bool;

    /// One iteration of periodic work. Returning false requests an
    /// unclean exit (no graceful-shutdown rendezvous).
    fn tick(&mut self) -> bool;

    /// Called between the two rendezvous barriers of a clean shutdown,
    /// after every peer in the group has also voted clean.
    fn stop_imminent(&mut self) {}

    /// Called on every thread exit, whatever the path.
    fn teardown(&mut self);
}

/// Lifecycle shell around a [`Worker`]: spawn, signal, stop, join.
///
/// The started and stopped events define three observable states:
/// not-started (stopped set), running (started set), and stopped again
/// after the run. A stopped worker may be started again; the body is kept
/// across runs.
///
/// Workers sharing a [`ShutdownRendezvous`] must have their common stop
/// flag raised before any of them is individually stopped or dropped,
/// otherwise the join waits on a rendezvous their peers never finish. The
/// `Supervisor` does this ordering for a whole group.
pub struct WorkerThread<W: Worker + Send + 'static> {
    name: String,
    body: Arc<Mutex<W>>,
    handle: Option<JoinHandle<()>>,
    started: Arc<Event>,
    stopped: Arc<Event>,
    internal_stop: StopFlag,
    external_stop: Option<StopFlag>,
    flags: StopFlagSet,
    tick_interval: Duration,
    poll_interval: Duration,
}

impl<W: Worker + Send + 'static> WorkerThread<W> {
    pub fn new(name: impl Into<String>, body: W) -> Self {
        Self::with_intervals(name, body, DEFAULT_TICK_INTERVAL, DEFAULT_TICK_INTERVAL)
    }

    /// Create a worker with custom loop and wait granularities. Intended
    /// for tuning via config and for fast tests.
    pub fn with_intervals(
        name: impl Into<String>,
        body: W,
        tick_interval: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            body: Arc::new(Mutex::new(body)),
            handle: None,
            started: Arc::new(Event::new(false)),
            // Not-running reads as stopped.
            stopped: Arc::new(Event::new(true)),
            internal_stop: StopFlag::new(),
            external_stop: None,
            flags: StopFlagSet::default(),
            tick_interval,
            poll_interval,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the worker thread and wait until it reports either started
    /// or stopped.
    ///
    /// Returns `Ok(true)` iff setup succeeded and the worker is running.
    /// On `Ok(false)` the thread has already been joined and the worker is
    /// back in the not-started state. Every error path also leaves the
    /// worker not-started with all handles released.
    pub fn start(
        &mut self,
        external_stop: &StopFlag,
        rendezvous: Option<Arc<ShutdownRendezvous>>,
    ) -> Result<bool> {
        if self.handle.is_some() || self.external_stop.is_some() {
            return Err(TunnlrError::AlreadyRunning);
        }

        self.internal_stop.clear();
        self.external_stop = Some(external_stop.clone());
        self.flags = StopFlagSet::new(vec![self.internal_stop.clone(), external_stop.clone()]);

        if self.flags.is_raised() {
            self.stop();
            return Err(TunnlrError::Aborted);
        }

        self.started.reset();
        self.stopped.reset();

        let body = WorkerBody {
            name: self.name.clone(),
            body: Arc::clone(&self.body),
            started: Arc::clone(&self.started),
            stopped: Arc::clone(&self.stopped),
            stop_flags: self.flags.clone(),
            rendezvous,
            tick_interval: self.tick_interval,
        };

        let spawned = thread::Builder::new()
            .name(format!("worker-{}", self.name))
            .spawn(move || body.run());

        match spawned {
            Ok(handle) => self.handle = Some(handle),
            Err(err) => {
                self.stop();
                self.stopped.set();
                return Err(TunnlrError::SpawnFailed(err));
            }
        }

        let started = loop {
            if self.started.is_set() {
                break true;
            }
            if self.stopped.is_set() {
                break false;
            }
            let finished = self.handle.as_ref().map_or(true, JoinHandle::is_finished);
            if finished && !self.started.is_set() && !self.stopped.is_set() {
                self.stop();
                self.stopped.set();
                return Err(TunnlrError::WaitFailed(
                    "worker thread exited without signalling".to_string(),
                ));
            }
            self.started.wait_timeout(self.poll_interval);
        };

        if !started {
            self.stop();
        }

        Ok(started)
    }

    /// Request a stop and join the thread. Idempotent; safe to call on a
    /// worker that never started.
    pub fn stop(&mut self) {
        self.internal_stop.raise();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                // The body catches hook panics itself; an error here can
                // only come from the runtime and is not actionable.
                warn!("worker {}: join reported an error", self.name);
            }
        }

        self.external_stop = None;
    }

    pub fn is_running(&self) -> bool {
        self.started.is_set() && !self.stopped.is_set()
    }

    /// The latching stopped signal, for controllers waiting on several
    /// workers at once.
    pub fn stopped_event(&self) -> Arc<Event> {
        Arc::clone(&self.stopped)
    }

    /// The composite stop-flag set from the current or last run.
    pub fn stop_flags(&self) -> StopFlagSet {
        self.flags.clone()
    }
}

impl<W: Worker + Send + 'static> Drop for WorkerThread<W> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the worker thread needs, moved onto it at spawn.
struct WorkerBody<W: Worker> {
    name: String,
    body: Arc<Mutex<W>>,
    started: Arc<Event>,
    stopped: Arc<Event>,
    stop_flags: StopFlagSet,
    rendezvous: Option<Arc<ShutdownRendezvous>>,
    tick_interval: Duration,
}

impl<W: Worker> WorkerBody<W> {
    /// Run a hook with panics contained to this call.
    fn call_hook<R>(&self, hook: impl FnOnce(&mut W) -> R) -> thread::Result<R> {
        catch_unwind(AssertUnwindSafe(|| {
            let mut body = self.body.lock().unwrap_or_else(PoisonError::into_inner);
            hook(&mut body)
        }))
    }

    fn run(self) {
        if let Some(rendezvous) = &self.rendezvous {
            rendezvous.announce_started();
        }

        let mut stopping_cleanly = false;

        // Aborted entry and failed setup both skip straight past the run
        // loop; the vote and the teardown below still happen.
        if !self.stop_flags.is_raised() {
            let setup_ok = match self.call_hook(Worker::setup) {
                Ok(ok) => ok,
                Err(_) => {
                    warn!("worker {}: setup panicked", self.name);
                    false
                }
            };

            if setup_ok {
                self.started.set();

                loop {
                    thread::sleep(self.tick_interval);

                    if self.stop_flags.is_raised() {
                        debug!("worker {}: stop requested", self.name);
                        stopping_cleanly = true;
                        break;
                    }

                    match self.call_hook(Worker::tick) {
                        Ok(true) => {}
                        Ok(false) => {
                            debug!("worker {}: tick requested exit", self.name);
                            break;
                        }
                        Err(_) => {
                            warn!("worker {}: tick panicked", self.name);
                            break;
                        }
                    }
                }
            }
        }

        if let Some(rendezvous) = &self.rendezvous {
            rendezvous.submit_clean_vote(stopping_cleanly);

            // A clean stop holds for the group; an unclean one bails
            // without waiting for anyone.
            if stopping_cleanly {
                debug!("worker {}: waiting for group clean votes", self.name);
                if rendezvous.await_all_clean_votes() {
                    if self.call_hook(Worker::stop_imminent).is_err() {
                        warn!("worker {}: stop_imminent panicked", self.name);
                    }
                    debug!("worker {}: waiting for group ready-to-stop", self.name);
                    rendezvous.announce_ready_to_stop();
                    rendezvous.await_all_ready_to_stop();
                }
            }
        }

        if self.call_hook(Worker::teardown).is_err() {
            warn!("worker {}: teardown panicked", self.name);
        }
        self.stopped.set();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FAST: Duration = Duration::from_millis(10);
    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct Counters {
        setup: AtomicUsize,
        tick: AtomicUsize,
        stop_imminent: AtomicUsize,
        teardown: AtomicUsize,
    }

    impl Counters {
        fn setup(&self) -> usize {
            self.setup.load(Ordering::SeqCst)
        }
        fn ticks(&self) -> usize {
            self.tick.load(Ordering::SeqCst)
        }
        fn stop_imminent(&self) -> usize {
            self.stop_imminent.load(Ordering::SeqCst)
        }
        fn teardowns(&self) -> usize {
            self.teardown.load(Ordering::SeqCst)
        }
    }

    struct TestWorker {
        counters: Arc<Counters>,
        setup_ok: bool,
        panic_in_setup: bool,
        panic_in_tick: bool,
        panic_in_teardown: bool,
        stop_after_ticks: Option<usize>,
    }

    impl TestWorker {
        fn looping(counters: Arc<Counters>) -> Self {
            Self {
                counters,
                setup_ok: true,
                panic_in_setup: false,
                panic_in_tick: false,
                panic_in_teardown: false,
                stop_after_ticks: None,
            }
        }
    }

    impl Worker for TestWorker {
        fn setup(&mut self) -> bool {
            self.counters.setup.fetch_add(1, Ordering::SeqCst);
            if self.panic_in_setup {
                panic!("setup failure");
            }
            self.setup_ok
        }

        fn tick(&mut self) -> bool {
            let count = self.counters.tick.fetch_add(1, Ordering::SeqCst) + 1;
            if self.panic_in_tick {
                panic!("tick failure");
            }
            match self.stop_after_ticks {
                Some(limit) => count < limit,
                None => true,
            }
        }

        fn stop_imminent(&mut self) {
            self.counters.stop_imminent.fetch_add(1, Ordering::SeqCst);
        }

        fn teardown(&mut self) {
            self.counters.teardown.fetch_add(1, Ordering::SeqCst);
            if self.panic_in_teardown {
                panic!("teardown failure");
            }
        }
    }

    fn fast_worker(body: TestWorker) -> WorkerThread<TestWorker> {
        WorkerThread::with_intervals("test", body, FAST, FAST)
    }

    #[test]
    fn test_start_then_external_cancel() {
        let counters = Arc::new(Counters::default());
        let mut worker = fast_worker(TestWorker::looping(counters.clone()));
        let external = StopFlag::new();

        assert!(worker.start(&external, None).unwrap());
        assert!(worker.is_running());

        external.raise();
        assert!(worker.stopped_event().wait_timeout(WAIT));
        assert!(!worker.is_running());

        worker.stop();
        assert_eq!(counters.setup(), 1);
        assert_eq!(counters.teardowns(), 1);
    }

    #[test]
    fn test_setup_returning_false_reports_not_started() {
        let counters = Arc::new(Counters::default());
        let mut body = TestWorker::looping(counters.clone());
        body.setup_ok = false;
        let mut worker = fast_worker(body);

        let started = worker.start(&StopFlag::new(), None).unwrap();
        assert!(!started);
        assert!(!worker.is_running());
        assert_eq!(counters.setup(), 1);
        assert_eq!(counters.ticks(), 0);
        // Teardown runs on every thread exit, failed setup included.
        assert_eq!(counters.teardowns(), 1);
    }

    #[test]
    fn test_setup_panic_reports_not_started() {
        let counters = Arc::new(Counters::default());
        let mut body = TestWorker::looping(counters.clone());
        body.panic_in_setup = true;
        let mut worker = fast_worker(body);

        let started = worker.start(&StopFlag::new(), None).unwrap();
        assert!(!started);
        assert_eq!(counters.ticks(), 0);
        assert_eq!(counters.teardowns(), 1);
    }

    #[test]
    fn test_tick_returning_false_stops_worker() {
        let counters = Arc::new(Counters::default());
        let mut body = TestWorker::looping(counters.clone());
        body.stop_after_ticks = Some(3);
        let mut worker = fast_worker(body);

        assert!(worker.start(&StopFlag::new(), None).unwrap());
        assert!(worker.stopped_event().wait_timeout(WAIT));
        worker.stop();

        assert_eq!(counters.ticks(), 3);
        assert_eq!(counters.teardowns(), 1);
    }

    #[test]
    fn test_tick_panic_stops_worker() {
        let counters = Arc::new(Counters::default());
        let mut body = TestWorker::looping(counters.clone());
        body.panic_in_tick = true;
        let mut worker = fast_worker(body);

        assert!(worker.start(&StopFlag::new(), None).unwrap());
        assert!(worker.stopped_event().wait_timeout(WAIT));
        worker.stop();

        assert_eq!(counters.ticks(), 1);
        assert_eq!(counters.teardowns(), 1);
    }

    #[test]
    fn test_teardown_panic_still_latches_stopped() {
        let counters = Arc::new(Counters::default());
        let mut body = TestWorker::looping(counters.clone());
        body.stop_after_ticks = Some(1);
        body.panic_in_teardown = true;
        let mut worker = fast_worker(body);

        assert!(worker.start(&StopFlag::new(), None).unwrap());
        assert!(worker.stopped_event().wait_timeout(WAIT));
        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_start_with_flag_already_raised_aborts() {
        let counters = Arc::new(Counters::default());
        let mut worker = fast_worker(TestWorker::looping(counters.clone()));
        let external = StopFlag::new();
        external.raise();

        let err = worker.start(&external, None).unwrap_err();
        assert!(matches!(err, TunnlrError::Aborted));
        assert!(!worker.is_running());
        assert_eq!(counters.setup(), 0);
        assert_eq!(counters.teardowns(), 0);
    }

    #[test]
    fn test_double_start_refused() {
        let counters = Arc::new(Counters::default());
        let mut worker = fast_worker(TestWorker::looping(counters));
        let external = StopFlag::new();

        assert!(worker.start(&external, None).unwrap());
        let err = worker.start(&external, None).unwrap_err();
        assert!(matches!(err, TunnlrError::AlreadyRunning));

        external.raise();
        worker.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let counters = Arc::new(Counters::default());
        let mut worker = fast_worker(TestWorker::looping(counters.clone()));

        assert!(worker.start(&StopFlag::new(), None).unwrap());
        worker.stop();
        worker.stop();

        assert!(!worker.is_running());
        assert_eq!(counters.teardowns(), 1);
    }

    #[test]
    fn test_stop_before_start_is_safe() {
        let counters = Arc::new(Counters::default());
        let mut worker = fast_worker(TestWorker::looping(counters));
        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_restart_after_stop() {
        let counters = Arc::new(Counters::default());
        let mut worker = fast_worker(TestWorker::looping(counters.clone()));
        let external = StopFlag::new();

        assert!(worker.start(&external, None).unwrap());
        worker.stop();
        assert!(worker.start(&external, None).unwrap());
        assert!(worker.is_running());
        worker.stop();

        assert_eq!(counters.setup(), 2);
        assert_eq!(counters.teardowns(), 2);
    }

    #[test]
    fn test_abort_then_clear_then_start() {
        let counters = Arc::new(Counters::default());
        let mut worker = fast_worker(TestWorker::looping(counters));
        let external = StopFlag::new();
        external.raise();

        assert!(worker.start(&external, None).is_err());

        external.clear();
        assert!(worker.start(&external, None).unwrap());
        worker.stop();
    }

    #[test]
    fn test_stop_flags_expose_internal_and_external() {
        let counters = Arc::new(Counters::default());
        let mut worker = fast_worker(TestWorker::looping(counters));
        let external = StopFlag::new();

        assert!(worker.start(&external, None).unwrap());
        let flags = worker.stop_flags();
        assert_eq!(flags.len(), 2);
        assert!(!flags.is_raised());

        external.raise();
        assert!(flags.is_raised());
        worker.stop();
    }

    #[test]
    fn test_single_participant_rendezvous_runs_stop_imminent() {
        let counters = Arc::new(Counters::default());
        let mut worker = fast_worker(TestWorker::looping(counters.clone()));
        let external = StopFlag::new();
        let rendezvous = Arc::new(ShutdownRendezvous::with_poll_interval(FAST));

        assert!(worker.start(&external, Some(rendezvous)).unwrap());
        external.raise();
        assert!(worker.stopped_event().wait_timeout(WAIT));
        worker.stop();

        // A clean stop with a group of one passes both barriers alone.
        assert_eq!(counters.stop_imminent(), 1);
        assert_eq!(counters.teardowns(), 1);
    }

    #[test]
    fn test_single_participant_unclean_exit_skips_stop_imminent() {
        let counters = Arc::new(Counters::default());
        let mut body = TestWorker::looping(counters.clone());
        body.stop_after_ticks = Some(1);
        let mut worker = fast_worker(body);
        let rendezvous = Arc::new(ShutdownRendezvous::with_poll_interval(FAST));

        assert!(worker.start(&StopFlag::new(), Some(rendezvous)).unwrap());
        assert!(worker.stopped_event().wait_timeout(WAIT));
        worker.stop();

        assert_eq!(counters.stop_imminent(), 0);
        assert_eq!(counters.teardowns(), 1);
    }

    #[test]
    fn test_drop_joins_running_worker() {
        let counters = Arc::new(Counters::default());
        let mut worker = fast_worker(TestWorker::looping(counters.clone()));

        assert!(worker.start(&StopFlag::new(), None).unwrap());
        drop(worker);
        assert_eq!(counters.teardowns(), 1);
    }
}
