/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key is empty or contains a forbidden segment.
    #[error("invalid document key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// A lock guarding in-memory state was poisoned by a panicking thread.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
