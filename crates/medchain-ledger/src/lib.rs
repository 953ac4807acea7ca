//! Append-only, hash-chained treatment ledger.
//!
//! Every [`Block`] commits to its predecessor's content hash, so editing any
//! persisted field breaks the chain at that block. This crate provides:
//! - `LedgerWriter` / `LedgerReader` trait boundaries
//! - [`LedgerStore`], a durable chain over any `DocumentStore`
//! - Integrity verification (first break) and audit (every break)
//! - Whole-chain backups with reversible rollback
//! - Summary statistics and read-only queries
//! - The [`Ledger`] facade wiring all of the above from a [`LedgerConfig`]

pub mod backup;
pub mod block;
pub mod codec;
pub mod config;
pub mod error;
pub mod ledger;
pub mod query;
pub mod stats;
pub mod store;
pub mod traits;
pub mod verify;

pub use backup::{
    BackupInfo, BackupManager, BackupRecord, Recovery, Rollback, PRE_ROLLBACK_LABEL,
};
pub use block::{Block, ChainView, LedgerSnapshot, FORMAT_VERSION};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::{Import, Ledger};
pub use medchain_crypto::{BreakReason, VerificationResult, Violation};
pub use stats::{summarize, ChainSummary};
pub use store::LedgerStore;
pub use traits::{LedgerReader, LedgerWriter};
pub use verify::{AuditReport, IntegrityVerifier};
