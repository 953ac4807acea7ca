use std::sync::Arc;

use medchain_store::{key, DocumentStore};
use medchain_types::{SnapshotId, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::block::{Block, ChainView, LedgerSnapshot, FORMAT_VERSION};
use crate::codec;
use crate::error::{LedgerError, LedgerResult};
use crate::store::LedgerStore;
use crate::verify::IntegrityVerifier;

/// Label given to the snapshot taken automatically before every rollback.
pub const PRE_ROLLBACK_LABEL: &str = "pre-rollback";

/// A labeled, timestamped copy of an entire chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupRecord {
    pub id: SnapshotId,
    pub label: String,
    pub created_at: Timestamp,
    pub snapshot: LedgerSnapshot,
}

/// Listing entry for a backup, without its blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub id: SnapshotId,
    pub label: String,
    pub created_at: Timestamp,
    pub block_count: u64,
}

/// Result of a rollback.
#[derive(Clone, Debug)]
pub struct Rollback {
    /// The chain now live in the store.
    pub chain: ChainView,
    /// Backup of the chain as it was just before the rollback; rolling back
    /// to it undoes this rollback.
    pub pre_rollback: SnapshotId,
}

/// Result of [`BackupManager::recover`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recovery {
    pub restored: SnapshotId,
    pub block_count: u64,
    /// Key holding the raw bytes of the replaced live document, if there was
    /// one. Raw documents are not listed as backups.
    pub preserved: Option<String>,
}

/// Takes whole-chain backups and restores them into a [`LedgerStore`].
///
/// Backups live in their own documents (`<dir>/<id>.json`), separate from
/// the live snapshot. Taking one never touches the live store.
pub struct BackupManager {
    documents: Arc<dyn DocumentStore>,
    dir: String,
}

impl BackupManager {
    pub fn new(documents: Arc<dyn DocumentStore>, dir: impl Into<String>) -> Self {
        Self {
            documents,
            dir: dir.into(),
        }
    }

    /// Persist a labeled copy of `blocks` and return its id.
    pub fn snapshot(&self, blocks: &[Block], label: &str) -> LedgerResult<SnapshotId> {
        let record = BackupRecord {
            id: SnapshotId::new(),
            label: label.to_string(),
            created_at: Timestamp::now(),
            snapshot: LedgerSnapshot::new(blocks.to_vec()),
        };
        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        self.documents.write(&self.key_for(&record.id), &bytes)?;
        info!(id = %record.id, label, blocks = blocks.len(), "backup taken");
        Ok(record.id)
    }

    /// Read a backup in full.
    pub fn get(&self, id: SnapshotId) -> LedgerResult<BackupRecord> {
        let bytes = self
            .documents
            .read(&self.key_for(&id))?
            .ok_or(LedgerError::SnapshotNotFound(id))?;
        let record: BackupRecord = serde_json::from_slice(&bytes)
            .map_err(|e| LedgerError::CorruptFormat(format!("backup {id}: {e}")))?;
        if record.snapshot.format_version != FORMAT_VERSION {
            return Err(LedgerError::CorruptFormat(format!(
                "backup {id}: unsupported format_version {}",
                record.snapshot.format_version
            )));
        }
        if record.id != id {
            return Err(LedgerError::CorruptFormat(format!(
                "backup {id}: document claims id {}",
                record.id
            )));
        }
        Ok(record)
    }

    /// All readable backups, oldest first.
    ///
    /// A backup document that fails to parse is logged and skipped.
    pub fn list(&self) -> LedgerResult<Vec<BackupInfo>> {
        let mut infos = Vec::new();
        for doc in self.documents.list(&self.dir)? {
            let Some(id) = parse_backup_key(&self.dir, &doc) else {
                continue;
            };
            let record = match self.get(id) {
                Ok(record) => record,
                Err(LedgerError::CorruptFormat(reason)) => {
                    warn!(%id, error = %reason, "unreadable backup skipped");
                    continue;
                }
                Err(e) => return Err(e),
            };
            infos.push(BackupInfo {
                id: record.id,
                label: record.label,
                created_at: record.created_at,
                block_count: record.snapshot.blocks.len() as u64,
            });
        }
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(infos)
    }

    /// Replace the store's chain wholesale with backup `id`.
    ///
    /// Runs under the store's writer lock: the target is read first (so an
    /// unknown id fails before anything is written), then the live chain is
    /// backed up as [`PRE_ROLLBACK_LABEL`], then the backup's blocks are
    /// persisted and published. A backup that fails verification is still
    /// restored, with a warning.
    pub fn rollback(&self, store: &LedgerStore, id: SnapshotId) -> LedgerResult<Rollback> {
        let mut pre_rollback = None;
        let chain = store.replace_with(|current| {
            let record = self.get(id)?;
            pre_rollback = Some(self.snapshot(current, PRE_ROLLBACK_LABEL)?);

            let verification = IntegrityVerifier::verify(&record.snapshot.blocks);
            if !verification.is_valid() {
                warn!(%id, ?verification, "restoring a backup that does not verify");
            }
            Ok(record.snapshot.blocks)
        })?;

        let pre_rollback = pre_rollback.ok_or_else(|| {
            LedgerError::Serialization("rollback finished without a pre-rollback snapshot".into())
        })?;
        info!(%id, %pre_rollback, blocks = chain.len(), "ledger rolled back");
        Ok(Rollback {
            chain,
            pre_rollback,
        })
    }

    /// Restore backup `id` as the live document `chain_key` without loading
    /// the current one.
    ///
    /// This is the way back from a live document that no longer parses, when
    /// no [`LedgerStore`] can be opened. The current bytes, whatever they
    /// are, are first copied to `<dir>/<new id>.unreadable`. Nothing may hold
    /// the store open while this runs.
    pub fn recover(&self, chain_key: &str, id: SnapshotId) -> LedgerResult<Recovery> {
        let record = self.get(id)?;

        let preserved = match self.documents.read(chain_key)? {
            Some(raw) => {
                let key = key::join(&self.dir, &format!("{}.unreadable", SnapshotId::new()));
                self.documents.write(&key, &raw)?;
                Some(key)
            }
            None => None,
        };

        let verification = IntegrityVerifier::verify(&record.snapshot.blocks);
        if !verification.is_valid() {
            warn!(%id, ?verification, "restoring a backup that does not verify");
        }
        let bytes = codec::encode_snapshot(&record.snapshot.blocks)?;
        self.documents.write(chain_key, &bytes)?;

        warn!(%id, chain_key, preserved = ?preserved, "live chain replaced from backup");
        Ok(Recovery {
            restored: id,
            block_count: record.snapshot.blocks.len() as u64,
            preserved,
        })
    }

    fn key_for(&self, id: &SnapshotId) -> String {
        key::join(&self.dir, &format!("{id}.json"))
    }
}

fn parse_backup_key(dir: &str, doc: &str) -> Option<SnapshotId> {
    let name = doc.strip_prefix(dir)?.strip_prefix('/')?;
    name.strip_suffix(".json")?.parse().ok()
}
