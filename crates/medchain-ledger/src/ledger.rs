use std::path::Path;
use std::sync::Arc;

use medchain_store::{DocumentStore, FileDocumentStore};
use medchain_types::{SnapshotId, TreatmentPayload};
use tracing::info;

use crate::backup::{BackupManager, Recovery, Rollback};
use crate::block::Block;
use crate::codec;
use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use crate::stats::{self, ChainSummary};
use crate::store::LedgerStore;
use crate::traits::{LedgerReader, LedgerWriter};
use crate::verify::{AuditReport, IntegrityVerifier};

/// A ledger store and its backup manager, wired from one configuration.
pub struct Ledger {
    config: LedgerConfig,
    store: LedgerStore,
    backups: BackupManager,
}

/// Result of a bulk import.
#[derive(Clone, Debug)]
pub struct Import {
    /// Backup taken before the import; `None` when there was nothing to import.
    pub backup: Option<SnapshotId>,
    pub blocks: Vec<Block>,
}

impl Ledger {
    /// Open a file-backed ledger under `config.data_dir`.
    pub fn open(config: LedgerConfig) -> LedgerResult<Self> {
        let documents = FileDocumentStore::open(&config.data_dir, config.sync_writes)?;
        Self::with_documents(Arc::new(documents), config)
    }

    /// Open a ledger over any document store.
    pub fn with_documents(
        documents: Arc<dyn DocumentStore>,
        config: LedgerConfig,
    ) -> LedgerResult<Self> {
        config.validate()?;
        Self::assemble(documents, config)
    }

    /// Restore backup `id` over a live document that cannot be opened, then
    /// open the restored ledger. See [`BackupManager::recover`].
    pub fn recover(config: LedgerConfig, id: SnapshotId) -> LedgerResult<(Self, Recovery)> {
        let documents = FileDocumentStore::open(&config.data_dir, config.sync_writes)?;
        Self::recover_with_documents(Arc::new(documents), config, id)
    }

    pub fn recover_with_documents(
        documents: Arc<dyn DocumentStore>,
        config: LedgerConfig,
        id: SnapshotId,
    ) -> LedgerResult<(Self, Recovery)> {
        config.validate()?;
        let recovery = BackupManager::new(Arc::clone(&documents), config.backup_dir.clone())
            .recover(&config.chain_document, id)?;
        Ok((Self::assemble(documents, config)?, recovery))
    }

    fn assemble(documents: Arc<dyn DocumentStore>, config: LedgerConfig) -> LedgerResult<Self> {
        let store = LedgerStore::open(Arc::clone(&documents), config.chain_document.clone())?;
        let backups = BackupManager::new(documents, config.backup_dir.clone());
        Ok(Self {
            config,
            store,
            backups,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn audit(&self) -> LedgerResult<AuditReport> {
        Ok(IntegrityVerifier::audit(&self.store.view()?))
    }

    pub fn summarize(&self) -> LedgerResult<ChainSummary> {
        Ok(stats::summarize(&self.store.view()?))
    }

    /// Back up the live chain under `label`.
    pub fn snapshot(&self, label: &str) -> LedgerResult<SnapshotId> {
        self.backups.snapshot(&self.store.view()?, label)
    }

    pub fn rollback(&self, id: SnapshotId) -> LedgerResult<Rollback> {
        self.backups.rollback(&self.store, id)
    }

    /// Back up the live chain, then append `payloads` in one durable write.
    ///
    /// An empty import writes nothing, not even the backup.
    pub fn import(&self, payloads: Vec<TreatmentPayload>) -> LedgerResult<Import> {
        if payloads.is_empty() {
            return Ok(Import {
                backup: None,
                blocks: Vec::new(),
            });
        }
        let backup = self.snapshot(&format!("pre-import ({} records)", payloads.len()))?;
        let blocks = self.store.append_batch(payloads)?;
        info!(%backup, imported = blocks.len(), "bulk import committed");
        Ok(Import {
            backup: Some(backup),
            blocks,
        })
    }

    /// Import a JSON array of payloads from a file.
    pub fn import_file(&self, path: &Path) -> LedgerResult<Import> {
        let bytes = std::fs::read(path)?;
        self.import(codec::decode_payloads(&bytes)?)
    }

    /// Export the live chain to `path`, honouring `sync_writes`.
    pub fn export(&self, path: &Path) -> LedgerResult<medchain_types::Digest> {
        self.store.export(path, self.config.sync_writes)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::block::tests::payload;
    use crate::error::LedgerError;
    use medchain_crypto::{BlockHasher, BreakReason, VerificationResult};
    use medchain_store::InMemoryDocumentStore;
    use medchain_types::ForgeryStatus;

    fn open_temp() -> (tempfile::TempDir, Ledger) {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            sync_writes: false,
            ..LedgerConfig::with_data_dir(dir.path().join("ledger"))
        };
        let ledger = Ledger::open(config).unwrap();
        (dir, ledger)
    }

    fn edit_chain_file(ledger: &Ledger, edit: impl FnOnce(&mut serde_json::Value)) {
        let path = ledger
            .config()
            .data_dir
            .join(&ledger.config().chain_document);
        let mut value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        edit(&mut value);
        fs::write(&path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
    }

    #[test]
    fn tamper_then_rollback_scenario() {
        let (_dir, ledger) = open_temp();
        for (i, dosage) in ["250mg", "500mg", "750mg"].iter().enumerate() {
            ledger
                .store()
                .append(payload(&format!("P-{i}"), dosage))
                .unwrap();
        }
        assert_eq!(ledger.store().len().unwrap(), 3);
        assert_eq!(ledger.store().verify().unwrap(), VerificationResult::Valid);
        let clean = ledger.snapshot("before edit").unwrap();

        edit_chain_file(&ledger, |v| v["blocks"][1]["payload"]["dosage"] = "5000mg".into());
        ledger.store().load().unwrap();
        assert_eq!(
            ledger.store().verify().unwrap(),
            VerificationResult::Broken {
                index: 1,
                reason: BreakReason::HashMismatch
            }
        );

        ledger.rollback(clean).unwrap();
        assert_eq!(ledger.store().verify().unwrap(), VerificationResult::Valid);
        assert_eq!(ledger.store().get(1).unwrap().payload().dosage, "500mg");
    }

    #[test]
    fn previous_hash_edit_on_disk_is_link_mismatch() {
        let (_dir, ledger) = open_temp();
        for i in 0..3 {
            ledger.store().append(payload(&format!("P-{i}"), "1mg")).unwrap();
        }
        edit_chain_file(&ledger, |v| {
            v["blocks"][2]["previous_hash"] = "ab".repeat(32).into();
        });
        ledger.store().load().unwrap();
        assert_eq!(
            ledger.store().verify().unwrap(),
            VerificationResult::Broken {
                index: 2,
                reason: BreakReason::LinkMismatch
            }
        );
    }

    #[test]
    fn forgery_verdict_edit_on_disk_is_detected() {
        let (_dir, ledger) = open_temp();
        let mut fake = payload("P-9", "1mg");
        fake.forgery.status = ForgeryStatus::Fake;
        ledger.store().append(payload("P-1", "1mg")).unwrap();
        ledger.store().append(fake).unwrap();

        edit_chain_file(&ledger, |v| {
            v["blocks"][1]["payload"]["forgery"]["status"] = "original".into();
        });
        ledger.store().load().unwrap();
        let report = ledger.audit().unwrap();
        assert_eq!(
            report.first(),
            VerificationResult::Broken {
                index: 1,
                reason: BreakReason::HashMismatch
            }
        );
    }

    #[test]
    fn unparseable_file_fails_open_with_corrupt_format() {
        let (dir, ledger) = open_temp();
        ledger.store().append(payload("P-1", "1mg")).unwrap();
        let config = ledger.config().clone();
        drop(ledger);

        fs::write(dir.path().join("ledger").join("chain.json"), b"[1, 2, 3").unwrap();
        assert!(matches!(
            Ledger::open(config),
            Err(LedgerError::CorruptFormat(_))
        ));
    }

    #[test]
    fn empty_ledger_starts_at_genesis() {
        let (_dir, ledger) = open_temp();
        assert_eq!(
            ledger.store().tail_hash().unwrap(),
            BlockHasher::genesis_hash()
        );
        let first = ledger.store().append(payload("P-1", "1mg")).unwrap();
        assert_eq!(*first.previous_hash(), BlockHasher::genesis_hash());
    }

    #[test]
    fn import_takes_a_backup_first() {
        let docs = Arc::new(InMemoryDocumentStore::new());
        let ledger = Ledger::with_documents(docs, LedgerConfig::default()).unwrap();
        ledger.store().append(payload("P-0", "1mg")).unwrap();

        let import = ledger
            .import(vec![payload("P-1", "1mg"), payload("P-2", "2mg")])
            .unwrap();
        assert_eq!(import.blocks.len(), 2);
        assert_eq!(ledger.store().len().unwrap(), 3);

        let backup = ledger.backups().get(import.backup.unwrap()).unwrap();
        assert_eq!(backup.snapshot.blocks.len(), 1);
        assert!(backup.label.starts_with("pre-import"));
    }

    #[test]
    fn empty_import_takes_no_backup() {
        let docs = Arc::new(InMemoryDocumentStore::new());
        let ledger = Ledger::with_documents(docs.clone(), LedgerConfig::default()).unwrap();
        ledger.store().append(payload("P-0", "1mg")).unwrap();
        let documents = docs.len().unwrap();

        let import = ledger.import(Vec::new()).unwrap();
        assert_eq!(import.backup, None);
        assert!(import.blocks.is_empty());
        assert_eq!(docs.len().unwrap(), documents);
        assert!(ledger.backups().list().unwrap().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_before_any_read() {
        let docs = Arc::new(InMemoryDocumentStore::new());
        let config = LedgerConfig {
            chain_document: "backups/chain.json".into(),
            ..LedgerConfig::default()
        };
        assert!(matches!(
            Ledger::with_documents(docs.clone(), config.clone()),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            Ledger::recover_with_documents(docs, config, SnapshotId::new()),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn recover_after_unparseable_chain_file() {
        let (dir, ledger) = open_temp();
        ledger.store().append(payload("P-0", "250mg")).unwrap();
        ledger.store().append(payload("P-1", "500mg")).unwrap();
        let good = ledger.snapshot("good").unwrap();
        let config = ledger.config().clone();
        drop(ledger);

        let chain = dir.path().join("ledger").join("chain.json");
        fs::write(&chain, b"{ truncated").unwrap();
        assert!(matches!(
            Ledger::open(config.clone()),
            Err(LedgerError::CorruptFormat(_))
        ));

        let (ledger, recovery) = Ledger::recover(config, good).unwrap();
        assert_eq!(recovery.block_count, 2);
        assert_eq!(ledger.store().len().unwrap(), 2);
        assert!(ledger.store().verify().unwrap().is_valid());
        assert_eq!(ledger.store().get(1).unwrap().payload().dosage, "500mg");

        let preserved = dir.path().join("ledger").join(recovery.preserved.unwrap());
        assert_eq!(fs::read(preserved).unwrap(), b"{ truncated");
        // Appends continue from the restored tail.
        assert_eq!(ledger.store().append(payload("P-2", "1mg")).unwrap().index(), 2);
    }

    #[test]
    fn import_file_and_export() {
        let (dir, ledger) = open_temp();
        let input = dir.path().join("import.json");
        fs::write(
            &input,
            serde_json::to_vec(&vec![payload("P-1", "1mg"), payload("P-2", "2mg")]).unwrap(),
        )
        .unwrap();
        ledger.import_file(&input).unwrap();

        let out = dir.path().join("out").join("export.json");
        ledger.export(&out).unwrap();
        let exported = codec::decode_snapshot(&fs::read(&out).unwrap()).unwrap();
        assert_eq!(exported.blocks, *ledger.store().view().unwrap());
        assert!(matches!(
            ledger.import_file(&dir.path().join("missing.json")),
            Err(LedgerError::Persistence(_))
        ));
    }

    #[test]
    fn summarize_counts_live_chain() {
        let (_dir, ledger) = open_temp();
        let mut suspicious = payload("P-2", "1mg");
        suspicious.forgery.status = ForgeryStatus::Suspicious;
        ledger.store().append(payload("P-1", "1mg")).unwrap();
        ledger.store().append(suspicious).unwrap();

        let summary = ledger.summarize().unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.count_by_status[&ForgeryStatus::Suspicious], 1);
        assert!(summary.earliest_timestamp <= summary.latest_timestamp);
    }
}
