//! Error types for tunnlr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in tunnlr
#[derive(Debug, Error)]
pub enum TunnlrError {
    /// A stop flag was already raised at the moment of start
    #[error("Start aborted: stop already signalled")]
    Aborted,

    /// The OS declined to create the worker thread
    #[error("Failed to spawn worker thread: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// The start-up wait ended abnormally
    #[error("Start-up wait failed: {0}")]
    WaitFailed(String),

    /// Start was called on a worker that is already running
    #[error("Worker is already running")]
    AlreadyRunning,

    /// A supervised worker refused to start
    #[error("Worker {0} failed to start")]
    StartFailed(String),
}

/// Result type alias for tunnlr operations
pub type Result<T> = std::result::Result<T, TunnlrError>;
