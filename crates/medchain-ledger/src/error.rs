use medchain_store::StoreError;
use medchain_types::SnapshotId;

/// Errors produced by ledger operations.
///
/// A broken chain is not an error: verification reports it as
/// [`VerificationResult::Broken`](medchain_crypto::VerificationResult).
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Durable read or write failed. An append that fails this way is not committed.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// The stored snapshot cannot be parsed as the expected structure.
    #[error("corrupt snapshot format: {0}")]
    CorruptFormat(String),

    #[error("block {index} not found (chain length {len})")]
    BlockNotFound { index: u64, len: u64 },

    #[error("snapshot {0} not found")]
    SnapshotNotFound(SnapshotId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    /// `true` for the two not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BlockNotFound { .. } | Self::SnapshotNotFound(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(StoreError::Io(e))
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
