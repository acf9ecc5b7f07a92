//! Worker-thread lifecycle framework
//!
//! A worker is one long-lived background activity on its own OS thread:
//! tunnel maintenance, handshake, status polling. The framework owns
//! spawning, started/stopped signalling, composite stop flags, and the
//! periodic run loop; implementers supply the hooks.

pub mod event;
pub mod lifecycle;
pub mod stop;

pub use event::Event;
pub use lifecycle::{Worker, WorkerThread, DEFAULT_TICK_INTERVAL};
pub use stop::{StopFlag, StopFlagSet};
