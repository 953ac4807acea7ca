use crate::error::StoreResult;

/// Keyed store of opaque documents.
///
/// All implementations must satisfy these invariants:
/// - `write` replaces the whole document atomically.
/// - A successful `write` is durable before it returns (subject to the
///   backend's sync configuration).
/// - Concurrent reads are always safe.
/// - All I/O errors are propagated, never silently ignored.
pub trait DocumentStore: Send + Sync {
    /// Read a document.
    ///
    /// Returns `Ok(None)` if the document does not exist.
    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Create or atomically replace a document.
    fn write(&self, key: &str, data: &[u8]) -> StoreResult<()>;

    /// Keys of the documents directly under `prefix`, sorted.
    ///
    /// An empty prefix lists the top level.
    fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;
}
