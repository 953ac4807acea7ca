//! Durable document storage for the Medchain treatment ledger.
//!
//! A document is an opaque byte string stored under a slash-separated key
//! such as `chain.json` or `backups/<id>.json`. The ledger keeps its live
//! snapshot and its backups here.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`FileDocumentStore`] -- one file per key under a root directory
//! - [`InMemoryDocumentStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Writes replace a document atomically: readers (and a restarted process)
//!    see either the old bytes or the new bytes, never a torn mix.
//! 2. The store never interprets document contents.
//! 3. Keys are validated; no key can escape the store root.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod key;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use traits::DocumentStore;
