use medchain_crypto::{ChainVerifier, VerificationResult, Violation};
use serde::Serialize;

use crate::block::Block;

/// Read-only integrity checks over a sequence of blocks.
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Walk the chain and report the first divergence, if any.
    pub fn verify(blocks: &[Block]) -> VerificationResult {
        ChainVerifier::verify(blocks)
    }

    /// Check every block and collect all divergences.
    pub fn audit(blocks: &[Block]) -> AuditReport {
        AuditReport {
            block_count: blocks.len() as u64,
            violations: ChainVerifier::audit(blocks),
        }
    }
}

/// Every divergence in a chain, for operator forensics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub block_count: u64,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// The lowest-index violation, in the same shape `verify` reports it.
    pub fn first(&self) -> VerificationResult {
        self.violations
            .first()
            .map_or(VerificationResult::Valid, |v| VerificationResult::Broken {
                index: v.index,
                reason: v.reason,
            })
    }
}
