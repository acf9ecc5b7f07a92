//! Worker group management
//!
//! The supervisor ties the lifecycle and coordination layers together for
//! a controller: one stop flag, one rendezvous, one set of workers.

pub mod supervisor;

pub use supervisor::{Supervisor, WorkerControl};
