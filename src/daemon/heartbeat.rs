//! Heartbeat worker
//!
//! A minimal periodic activity: it proves the worker group is alive by
//! logging at a configured cadence. The daemon runs a few of these in
//! place of the real tunnel and polling bodies.

use log::{debug, info};

use crate::worker::Worker;

pub struct HeartbeatWorker {
    name: String,
    log_every_ticks: u64,
    ticks: u64,
}

impl HeartbeatWorker {
    pub fn new(name: impl Into<String>, log_every_ticks: u64) -> Self {
        Self {
            name: name.into(),
            log_every_ticks: log_every_ticks.max(1),
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Worker for HeartbeatWorker {
    fn setup(&mut self) -> bool {
        self.ticks = 0;
        info!("{}: heartbeat starting", self.name);
        true
    }

    fn tick(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks % self.log_every_ticks == 0 {
            debug!("{}: alive after {} ticks", self.name, self.ticks);
        }
        true
    }

    fn stop_imminent(&mut self) {
        info!("{}: group stop imminent", self.name);
    }

    fn teardown(&mut self) {
        info!("{}: heartbeat stopped after {} ticks", self.name, self.ticks);
    }
}
