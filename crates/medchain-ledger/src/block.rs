use std::sync::Arc;

use medchain_crypto::{BlockFields, BlockHasher, ChainLink};
use medchain_types::{Digest, Timestamp, TreatmentPayload};
use serde::{Deserialize, Serialize};

/// Current on-disk snapshot format. Bump when the block or payload shape changes.
pub const FORMAT_VERSION: u32 = 1;

/// An immutable, shared view of the chain at one instant.
pub type ChainView = Arc<Vec<Block>>;

/// One treatment event committed to the ledger.
///
/// Fields are private: once constructed a block is a read-only value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    index: u64,
    timestamp: Timestamp,
    payload: TreatmentPayload,
    previous_hash: Digest,
    content_hash: Digest,
}

impl Block {
    /// Construct a block and stamp its content hash.
    pub fn new(
        index: u64,
        timestamp: Timestamp,
        payload: TreatmentPayload,
        previous_hash: Digest,
    ) -> Self {
        let content_hash = BlockHasher::compute(&BlockFields {
            index,
            timestamp: &timestamp,
            payload: &payload,
            previous_hash: &previous_hash,
        });
        Self {
            index,
            timestamp,
            payload,
            previous_hash,
            content_hash,
        }
    }

    /// Construct the block that follows `predecessor` (or the first block when
    /// `None`), timestamped now but never earlier than the predecessor.
    pub fn next(predecessor: Option<&Block>, index: u64, payload: TreatmentPayload) -> Self {
        let now = Timestamp::now();
        let (previous_hash, timestamp) = match predecessor {
            Some(prev) => (prev.content_hash, now.max(prev.timestamp)),
            None => (BlockHasher::genesis_hash(), now),
        };
        Self::new(index, timestamp, payload, previous_hash)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn payload(&self) -> &TreatmentPayload {
        &self.payload
    }

    pub fn previous_hash(&self) -> &Digest {
        &self.previous_hash
    }

    pub fn content_hash(&self) -> &Digest {
        &self.content_hash
    }

    /// Recompute the content hash from the stored fields.
    pub fn recompute_hash(&self) -> Digest {
        BlockHasher::compute(&self.fields())
    }

    /// `true` if the stored hash matches the stored fields.
    pub fn hash_is_consistent(&self) -> bool {
        self.recompute_hash() == self.content_hash
    }

    fn fields(&self) -> BlockFields<'_> {
        BlockFields {
            index: self.index,
            timestamp: &self.timestamp,
            payload: &self.payload,
            previous_hash: &self.previous_hash,
        }
    }
}

impl ChainLink for Block {
    fn index(&self) -> u64 {
        self.index
    }

    fn previous_hash(&self) -> Digest {
        self.previous_hash
    }

    fn content_hash(&self) -> Digest {
        self.content_hash
    }

    fn recompute_hash(&self) -> Digest {
        Block::recompute_hash(self)
    }
}

/// The unit of persistence and of backup/restore.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub format_version: u32,
    pub blocks: Vec<Block>,
}

impl LedgerSnapshot {
    /// Wrap blocks in a snapshot at the current format version.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            blocks,
        }
    }
}
