//! Harness error taxonomy
//!
//! Transport-level failures (`Spawn`, `NotRunning`, `ProcessEnded`) are
//! surfaced to the immediate caller and never retried here; retry policy
//! belongs to the test scenario. `Timeout` is an expected, recoverable
//! outcome, not a harness bug, and `ProcessEnded` is kept distinct so
//! callers can tell "the target hung" from "the target crashed".

use crate::pty::PtyError;

/// Error type for harness operations
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Failed to spawn {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: PtyError,
    },

    #[error("No live process attached to this session")]
    NotRunning,

    #[error("Pattern {pattern:?} did not appear within {timeout_ms}ms")]
    Timeout { pattern: String, timeout_ms: u64 },

    #[error("Process exited while waiting for {pattern:?}")]
    ProcessEnded { pattern: String },

    #[error("Unknown key action {name:?}")]
    UnknownAction { name: String },

    #[error("Invalid wait pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error(transparent)]
    Pty(#[from] PtyError),
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
