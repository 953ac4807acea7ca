use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::key;
use crate::traits::DocumentStore;

/// In-memory, `BTreeMap`-based document store.
///
/// Intended for tests and embedding. Documents are held behind a `RwLock`
/// and cloned on read and write, so replacement is trivially atomic.
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self
            .documents
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .len())
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        key::validate(key)?;
        let map = self.documents.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(key).cloned())
    }

    fn write(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        key::validate(key)?;
        let mut map = self
            .documents
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        map.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        key::validate_prefix(prefix)?;
        let map = self.documents.read().map_err(|_| StoreError::LockPoisoned)?;
        let lead = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        // BTreeMap iteration is already sorted.
        Ok(map
            .keys()
            .filter(|k| {
                k.strip_prefix(&lead)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.documents.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("InMemoryDocumentStore")
            .field("document_count", &count)
            .finish()
    }
}
