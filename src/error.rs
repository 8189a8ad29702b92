//! Error types for the Tether engine.

use thiserror::Error;

/// All possible failures of a synchronization pass or a local operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No network connectivity; no attempt was made.
    #[error("network connectivity unavailable")]
    NetworkUnavailable,

    /// Local or remote storage failed, with the underlying cause text.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The remote rejected a push because another writer updated the
    /// dataset concurrently. Recovered by retrying; only surfaced once
    /// the retry budget is gone.
    #[error("remote rejected push: {0}")]
    Conflict(String),

    /// A callback declined to continue at a decision point.
    #[error("synchronization cancelled: {0}")]
    Cancelled(String),

    /// The retry budget was exhausted without reaching a terminal state.
    #[error("synchronization exhausted its retry budget")]
    RetriesExhausted,

    #[error("invalid record key: {0}")]
    InvalidKey(String),

    #[error("invalid dataset name: {0}")]
    InvalidDatasetName(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SyncError>;
