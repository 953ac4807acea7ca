//! Foundation types for the Medchain treatment ledger.
//!
//! This crate provides the value types shared by every other Medchain crate.
//! It performs no hashing and no I/O.
//!
//! # Key Types
//!
//! - [`Digest`]: 256-bit content digest, hex encoded on disk
//! - [`Timestamp`]: UTC instant with a deterministic byte encoding
//! - [`TreatmentPayload`]: the fixed-schema treatment record carried by a block
//! - [`ForgeryVerdict`]: forgery-status label plus confidence score
//! - [`SnapshotId`]: UUID v7 identifier of a chain backup

pub mod digest;
pub mod error;
pub mod payload;
pub mod snapshot;
pub mod temporal;

pub use digest::Digest;
pub use error::TypeError;
pub use payload::{ConfidenceScore, ForgeryStatus, ForgeryVerdict, TreatmentPayload};
pub use snapshot::SnapshotId;
pub use temporal::Timestamp;
