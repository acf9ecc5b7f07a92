//! Daemon runtime
//!
//! Wires a supervisor full of workers to the process environment: OS
//! signals raise the group stop flag, and the run loop blocks until every
//! worker has latched its stopped signal.

pub mod heartbeat;

use std::sync::Arc;
use std::thread;

use eyre::{Context, Result};
use log::info;
use signal_hook::consts::{SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::config::Config;
use crate::coordination::ShutdownRendezvous;
use crate::manager::Supervisor;
use crate::worker::{StopFlag, WorkerThread};

use self::heartbeat::HeartbeatWorker;

/// Install signal handlers that raise the given stop flag.
///
/// The handler thread is a daemon in spirit: it dies with the process and
/// is never joined.
pub fn install_signal_handlers(stop_flag: &StopFlag) -> Result<()> {
    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGQUIT]).context("Failed to register signal handlers")?;

    let stop_flag = stop_flag.clone();
    thread::Builder::new()
        .name("signal-handler".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!("received signal {signal}, requesting stop");
                stop_flag.raise();
            }
        })
        .context("Failed to spawn signal handler thread")?;

    Ok(())
}

/// Build the worker group from config and run it until a stop request.
pub fn run(config: &Config) -> Result<()> {
    let rendezvous = Arc::new(ShutdownRendezvous::with_poll_interval(
        config.worker.poll_interval(),
    ));
    let mut supervisor = Supervisor::with_rendezvous(rendezvous);

    for index in 0..config.daemon.workers {
        let name = format!("heartbeat-{index}");
        let body = HeartbeatWorker::new(name.as_str(), config.daemon.heartbeat_every_ticks);
        supervisor.add(WorkerThread::with_intervals(
            name,
            body,
            config.worker.tick_interval(),
            config.worker.poll_interval(),
        ));
    }

    install_signal_handlers(&supervisor.stop_flag())?;

    supervisor.start_all().context("Failed to start workers")?;
    info!("{} workers running", supervisor.worker_count());

    supervisor.wait_all_stopped();
    supervisor.stop_all();
    info!("all workers stopped");

    Ok(())
}
