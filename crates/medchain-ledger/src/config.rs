use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Where and how a ledger is stored.
///
/// ```toml
/// data_dir = "/var/lib/medchain"
/// chain_document = "chain.json"
/// backup_dir = "backups"
/// sync_writes = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Root directory for the live snapshot and backups.
    pub data_dir: PathBuf,
    /// Key of the live snapshot document under `data_dir`.
    pub chain_document: String,
    /// Directory (under `data_dir`) holding backup snapshots.
    pub backup_dir: String,
    /// `fsync` each write before and after the atomic rename.
    pub sync_writes: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("medchain-data"),
            chain_document: "chain.json".into(),
            backup_dir: "backups".into(),
            sync_writes: true,
        }
    }
}

impl LedgerConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> LedgerResult<String> {
        toml::to_string_pretty(self).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Check that the document names are usable store keys and do not collide.
    pub fn validate(&self) -> LedgerResult<()> {
        medchain_store::key::validate(&self.chain_document)
            .map_err(|e| LedgerError::Config(format!("chain_document: {e}")))?;
        medchain_store::key::validate(&self.backup_dir)
            .map_err(|e| LedgerError::Config(format!("backup_dir: {e}")))?;
        if self.chain_document == self.backup_dir
            || self
                .chain_document
                .starts_with(&format!("{}/", self.backup_dir))
        {
            return Err(LedgerError::Config(
                "chain_document must live outside backup_dir".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LedgerConfig::default();
        assert_eq!(c.data_dir, PathBuf::from("medchain-data"));
        assert_eq!(c.chain_document, "chain.json");
        assert_eq!(c.backup_dir, "backups");
        assert!(c.sync_writes);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let c = LedgerConfig::from_toml_str("data_dir = \"/srv/ledger\"\nsync_writes = false\n")
            .unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/srv/ledger"));
        assert!(!c.sync_writes);
        assert_eq!(c.chain_document, "chain.json");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = LedgerConfig::from_toml_str("data_dri = \"typo\"").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn escaping_document_names_are_rejected() {
        let err = LedgerConfig::from_toml_str("chain_document = \"../chain.json\"").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn chain_inside_backup_dir_is_rejected() {
        let err =
            LedgerConfig::from_toml_str("chain_document = \"backups/chain.json\"").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let c = LedgerConfig::with_data_dir("/tmp/medchain");
        let text = c.to_toml_string().unwrap();
        assert_eq!(LedgerConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medchain.toml");
        std::fs::write(&path, "backup_dir = \"snapshots\"\n").unwrap();
        let c = LedgerConfig::load(&path).unwrap();
        assert_eq!(c.backup_dir, "snapshots");
        assert!(LedgerConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
