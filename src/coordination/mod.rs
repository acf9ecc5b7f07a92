//! Cross-worker coordination
//!
//! The shutdown rendezvous lets a group of peer workers agree on a
//! graceful shutdown, or abandon one the moment any peer exits uncleanly.

pub mod rendezvous;

pub use rendezvous::{ShutdownRendezvous, DEFAULT_POLL_INTERVAL};
