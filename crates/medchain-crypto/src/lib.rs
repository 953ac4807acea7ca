//! Cryptographic primitives for the Medchain treatment ledger.
//!
//! Provides domain-separated BLAKE3 hashing, the block hash/link function,
//! and the hash-chain verification walk.
//!
//! All crypto operations wrap established libraries. No custom cryptography.

pub mod chain;
pub mod hasher;

pub use chain::{
    BlockFields, BlockHasher, BreakReason, ChainLink, ChainVerifier, VerificationResult, Violation,
};
pub use hasher::ContentHasher;
