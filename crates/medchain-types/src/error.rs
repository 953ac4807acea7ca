use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("confidence {0} out of range (0..=10000 basis points)")]
    ConfidenceOutOfRange(u32),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid snapshot id: {0}")]
    InvalidSnapshotId(String),
}
