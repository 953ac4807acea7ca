use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use medchain_crypto::{BlockHasher, ContentHasher};
use medchain_store::{DocumentStore, FileDocumentStore};
use medchain_types::{Digest, TreatmentPayload};
use tracing::{debug, info};

use crate::block::{Block, ChainView};
use crate::codec;
use crate::query;
use crate::error::{LedgerError, LedgerResult};
use crate::traits::{LedgerReader, LedgerWriter};

/// The live chain: an in-memory sequence mirrored by one durable document.
///
/// Mutations (`append`, `append_batch`, `load`, rollback) serialize on a
/// single writer lock and persist the whole snapshot before publishing the
/// new in-memory view, so memory never runs ahead of disk. Readers clone the
/// published `Arc` and never observe a half-applied change.
pub struct LedgerStore {
    documents: Arc<dyn DocumentStore>,
    chain_key: String,
    writer: Mutex<()>,
    chain: RwLock<ChainView>,
}

impl LedgerStore {
    /// Open the store and load the durable snapshot stored under `chain_key`.
    ///
    /// A missing document is an empty chain.
    pub fn open(
        documents: Arc<dyn DocumentStore>,
        chain_key: impl Into<String>,
    ) -> LedgerResult<Self> {
        let chain_key = chain_key.into();
        let blocks = read_durable(documents.as_ref(), &chain_key)?;
        info!(key = %chain_key, blocks = blocks.len(), "ledger loaded");
        Ok(Self {
            documents,
            chain_key,
            writer: Mutex::new(()),
            chain: RwLock::new(Arc::new(blocks)),
        })
    }

    /// Re-read the durable snapshot, replacing the in-memory chain.
    ///
    /// Fails with [`LedgerError::CorruptFormat`] if the document cannot be
    /// parsed; the in-memory chain is then left as it was.
    pub fn load(&self) -> LedgerResult<ChainView> {
        let _guard = self.lock_writer()?;
        let blocks = read_durable(self.documents.as_ref(), &self.chain_key)?;
        info!(key = %self.chain_key, blocks = blocks.len(), "ledger reloaded");
        self.publish(blocks)
    }

    /// Key of the live snapshot document.
    pub fn chain_key(&self) -> &str {
        &self.chain_key
    }

    /// Atomically write the current snapshot to `path`.
    ///
    /// Returns a checksum of the exported bytes.
    pub fn export(&self, path: &Path, sync: bool) -> LedgerResult<Digest> {
        let view = self.view()?;
        let bytes = codec::encode_snapshot(&view)?;
        FileDocumentStore::write_atomic(path, &bytes, sync)?;
        let checksum = ContentHasher::SNAPSHOT.hash(&bytes);
        info!(path = %path.display(), blocks = view.len(), %checksum, "ledger exported");
        Ok(checksum)
    }

    /// Replace the whole chain under the writer lock.
    ///
    /// `f` sees the current view and returns the replacement; it runs while
    /// no append can interleave. The replacement is persisted before it is
    /// published.
    pub(crate) fn replace_with<F>(&self, f: F) -> LedgerResult<ChainView>
    where
        F: FnOnce(&ChainView) -> LedgerResult<Vec<Block>>,
    {
        let _guard = self.lock_writer()?;
        let current = self.view()?;
        let blocks = f(&current)?;
        self.persist(&blocks)?;
        self.publish(blocks)
    }

    fn commit(&self, payloads: Vec<TreatmentPayload>) -> LedgerResult<Vec<Block>> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.lock_writer()?;
        let current = self.view()?;

        let mut blocks = Vec::with_capacity(current.len() + payloads.len());
        blocks.extend(current.iter().cloned());
        let mut committed = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let block = Block::next(blocks.last(), blocks.len() as u64, payload);
            committed.push(block.clone());
            blocks.push(block);
        }

        // Nothing is published unless the durable write succeeded.
        self.persist(&blocks)?;
        self.publish(blocks)?;

        for block in &committed {
            debug!(
                index = block.index(),
                hash = %block.content_hash().short_hex(),
                patient = %block.payload().patient_id,
                "block appended"
            );
        }
        Ok(committed)
    }

    fn persist(&self, blocks: &[Block]) -> LedgerResult<()> {
        let bytes = codec::encode_snapshot(blocks)?;
        self.documents.write(&self.chain_key, &bytes)?;
        debug!(
            key = %self.chain_key,
            blocks = blocks.len(),
            bytes = bytes.len(),
            "snapshot persisted"
        );
        Ok(())
    }

    fn publish(&self, blocks: Vec<Block>) -> LedgerResult<ChainView> {
        let view = Arc::new(blocks);
        let mut slot = self.chain.write().map_err(|_| LedgerError::LockPoisoned)?;
        *slot = Arc::clone(&view);
        Ok(view)
    }

    fn lock_writer(&self) -> LedgerResult<MutexGuard<'_, ()>> {
        self.writer.lock().map_err(|_| LedgerError::LockPoisoned)
    }
}

fn read_durable(documents: &dyn DocumentStore, key: &str) -> LedgerResult<Vec<Block>> {
    match documents.read(key)? {
        Some(bytes) => Ok(codec::decode_snapshot(&bytes)?.blocks),
        None => Ok(Vec::new()),
    }
}

impl LedgerWriter for LedgerStore {
    fn append(&self, payload: TreatmentPayload) -> LedgerResult<Block> {
        let mut committed = self.commit(vec![payload])?;
        committed
            .pop()
            .ok_or_else(|| LedgerError::Serialization("append committed no block".into()))
    }

    fn append_batch(&self, payloads: Vec<TreatmentPayload>) -> LedgerResult<Vec<Block>> {
        self.commit(payloads)
    }
}

impl LedgerReader for LedgerStore {
    fn view(&self) -> LedgerResult<ChainView> {
        let slot = self.chain.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(Arc::clone(&slot))
    }

    fn get(&self, index: u64) -> LedgerResult<Block> {
        let view = self.view()?;
        query::block_at(&view, index).cloned()
    }

    fn tail_hash(&self) -> LedgerResult<Digest> {
        Ok(self
            .view()?
            .last()
            .map_or(BlockHasher::genesis_hash(), |b| *b.content_hash()))
    }
}

impl std::fmt::Debug for LedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.chain.read().map(|c| c.len()).unwrap_or_default();
        f.debug_struct("LedgerStore")
            .field("chain_key", &self.chain_key)
            .field("blocks", &len)
            .finish()
    }
}
