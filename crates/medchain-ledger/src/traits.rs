use medchain_crypto::VerificationResult;
use medchain_types::{Digest, TreatmentPayload};

use crate::block::{Block, ChainView};
use crate::error::LedgerResult;
use crate::verify::IntegrityVerifier;

/// Write boundary used by the treatment-creation workflow.
pub trait LedgerWriter: Send + Sync {
    /// Commit one payload. The returned block's content hash is the
    /// verification token the caller may show to users.
    fn append(&self, payload: TreatmentPayload) -> LedgerResult<Block>;

    /// Commit several payloads with a single durable write, all or nothing.
    fn append_batch(&self, payloads: Vec<TreatmentPayload>) -> LedgerResult<Vec<Block>>;
}

/// Read boundary used by the viewing and admin workflows.
pub trait LedgerReader: Send + Sync {
    /// An immutable view of the whole chain as of this call.
    fn view(&self) -> LedgerResult<ChainView>;

    fn get(&self, index: u64) -> LedgerResult<Block>;

    /// Content hash of the last block, or the genesis constant when empty.
    fn tail_hash(&self) -> LedgerResult<Digest>;

    fn len(&self) -> LedgerResult<u64> {
        Ok(self.view()?.len() as u64)
    }

    fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Verify the whole chain over one consistent view.
    fn verify(&self) -> LedgerResult<VerificationResult> {
        Ok(IntegrityVerifier::verify(&self.view()?))
    }
}
