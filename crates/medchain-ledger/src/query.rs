//! Read-only lookups over a chain view.

use medchain_types::Digest;

use crate::block::Block;
use crate::error::{LedgerError, LedgerResult};

/// The block at `index`.
pub fn block_at(blocks: &[Block], index: u64) -> LedgerResult<&Block> {
    usize::try_from(index)
        .ok()
        .and_then(|i| blocks.get(i))
        .ok_or(LedgerError::BlockNotFound {
            index,
            len: blocks.len() as u64,
        })
}

/// The block whose content hash equals `hash` (the verification token handed
/// out at append time).
pub fn find_by_hash<'a>(blocks: &'a [Block], hash: &Digest) -> Option<&'a Block> {
    blocks.iter().find(|b| b.content_hash() == hash)
}

/// All blocks recorded for a patient, in chain order.
pub fn records_for_patient<'a>(blocks: &'a [Block], patient_id: &str) -> Vec<&'a Block> {
    blocks
        .iter()
        .filter(|b| b.payload().patient_id == patient_id)
        .collect()
}

/// All blocks recorded by a doctor, in chain order.
pub fn records_by_doctor<'a>(blocks: &'a [Block], doctor_id: &str) -> Vec<&'a Block> {
    blocks
        .iter()
        .filter(|b| b.payload().doctor_id == doctor_id)
        .collect()
}

/// The last `count` blocks, oldest first.
pub fn recent(blocks: &[Block], count: usize) -> &[Block] {
    &blocks[blocks.len().saturating_sub(count)..]
}
