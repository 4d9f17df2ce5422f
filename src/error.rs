//! Invariant violations raised to the caller of the offending operation.
//!
//! Transient I/O absence and protocol violations never surface as errors;
//! they are absorbed where they are detected. Everything here indicates a
//! programming error upstream and is returned synchronously.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A second heartbeat writer was requested for a path that already has one.
    #[error("heartbeat writer already active at {}", path.display())]
    DuplicateHeartbeat { path: PathBuf },

    /// A session or game was constructed with the wrong number of participants.
    #[error("expected {expected} participants, got {actual}")]
    InvalidParticipantCount { expected: usize, actual: usize },

    /// A move names a slot that is out of range or already occupied.
    #[error("invalid move: slot {slot}")]
    InvalidMove { slot: usize },

    /// A liveness probe found another coordinator heartbeating at this path.
    #[error("coordinator is already running at {}", path.display())]
    CoordinatorAlreadyRunning { path: PathBuf },

    /// An async task observed its cancellation token.
    #[error("task cancelled")]
    Cancelled,
}
