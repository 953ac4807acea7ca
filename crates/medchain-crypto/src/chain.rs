use std::fmt;

use medchain_types::{Digest, Timestamp, TreatmentPayload};
use serde::{Deserialize, Serialize};

use crate::hasher::ContentHasher;

/// The fields of a block that feed its content hash.
#[derive(Clone, Copy, Debug)]
pub struct BlockFields<'a> {
    pub index: u64,
    pub timestamp: &'a Timestamp,
    pub payload: &'a TreatmentPayload,
    pub previous_hash: &'a Digest,
}

/// Block hash/link function.
///
/// `content_hash = BLAKE3("medchain-block-v1:" ‖ index ‖ timestamp ‖ payload ‖ previous_hash)`
/// with `index` as `u64` big-endian, the timestamp and payload in their
/// canonical encodings, and the raw 32 bytes of `previous_hash`. Because the
/// predecessor's hash is hashed in, editing any block invalidates the link of
/// every block after it.
pub struct BlockHasher;

impl BlockHasher {
    /// Compute the content hash of a block from its fields.
    pub fn compute(fields: &BlockFields<'_>) -> Digest {
        let payload = fields.payload.canonical_bytes();
        ContentHasher::BLOCK.hash_parts(&[
            &fields.index.to_be_bytes(),
            &fields.timestamp.canonical_bytes(),
            &payload,
            fields.previous_hash.as_bytes(),
        ])
    }

    /// The `previous_hash` of the block at index 0: 32 zero bytes.
    pub const fn genesis_hash() -> Digest {
        Digest::zero()
    }
}

/// Something that occupies a position in a hash chain.
pub trait ChainLink {
    /// The stored ordinal position.
    fn index(&self) -> u64;
    /// The stored link to the predecessor.
    fn previous_hash(&self) -> Digest;
    /// The stored content hash.
    fn content_hash(&self) -> Digest;
    /// The content hash recomputed from the stored fields.
    fn recompute_hash(&self) -> Digest;
}

/// Why a chain stopped verifying at a given position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakReason {
    /// Recomputed content hash differs from the stored one.
    HashMismatch,
    /// Stored `previous_hash` differs from the predecessor's content hash.
    LinkMismatch,
    /// Stored index is not exactly one more than the predecessor's.
    IndexGap,
}

impl BreakReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HashMismatch => "hash_mismatch",
            Self::LinkMismatch => "link_mismatch",
            Self::IndexGap => "index_gap",
        }
    }
}

impl fmt::Display for BreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a verification walk. A broken chain is data, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum VerificationResult {
    Valid,
    Broken { index: u64, reason: BreakReason },
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// One divergence found by [`ChainVerifier::audit`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Position in the sequence (0-based).
    pub index: u64,
    pub reason: BreakReason,
    pub expected: String,
    pub actual: String,
}

/// Hash chain integrity verifier.
pub struct ChainVerifier;

impl ChainVerifier {
    /// Walk the chain in order and report the first divergence.
    ///
    /// For each position the checks run as: index, then link, then hash.
    pub fn verify<L: ChainLink>(links: &[L]) -> VerificationResult {
        let mut expected_prev = BlockHasher::genesis_hash();

        for (position, link) in links.iter().enumerate() {
            let position = position as u64;
            if let Some(reason) = Self::check(position, &expected_prev, link) {
                return VerificationResult::Broken {
                    index: position,
                    reason,
                };
            }
            expected_prev = link.content_hash();
        }

        VerificationResult::Valid
    }

    /// Check every position against its stored predecessor and report all
    /// divergences, not just the first.
    ///
    /// Each position contributes at most one violation, chosen with the same
    /// precedence as [`ChainVerifier::verify`]. The first entry therefore
    /// always agrees with `verify`.
    pub fn audit<L: ChainLink>(links: &[L]) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut expected_prev = BlockHasher::genesis_hash();

        for (position, link) in links.iter().enumerate() {
            let position = position as u64;
            if let Some(reason) = Self::check(position, &expected_prev, link) {
                let (expected, actual) = match reason {
                    BreakReason::IndexGap => (position.to_string(), link.index().to_string()),
                    BreakReason::LinkMismatch => {
                        (expected_prev.to_hex(), link.previous_hash().to_hex())
                    }
                    BreakReason::HashMismatch => {
                        (link.recompute_hash().to_hex(), link.content_hash().to_hex())
                    }
                };
                violations.push(Violation {
                    index: position,
                    reason,
                    expected,
                    actual,
                });
            }
            expected_prev = link.content_hash();
        }

        violations
    }

    fn check<L: ChainLink>(position: u64, expected_prev: &Digest, link: &L) -> Option<BreakReason> {
        if link.index() != position {
            return Some(BreakReason::IndexGap);
        }
        if link.previous_hash() != *expected_prev {
            return Some(BreakReason::LinkMismatch);
        }
        if link.recompute_hash() != link.content_hash() {
            return Some(BreakReason::HashMismatch);
        }
        None
    }
}
