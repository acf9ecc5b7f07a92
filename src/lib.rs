//! tunnlr - coordinated background workers for a circumvention client
//!
//! Long-lived activities (tunnel maintenance, handshake, status polling)
//! run as a group of peer workers, each on a dedicated thread. The group
//! shares a composite stop signal and a shutdown rendezvous: when every
//! worker stops cleanly they wind down together, and a single unclean
//! exit makes the whole group bail immediately.

pub mod cli;
pub mod config;
pub mod coordination;
pub mod daemon;
pub mod error;
pub mod manager;
pub mod session;
pub mod worker;

pub use error::{Result, TunnlrError};
