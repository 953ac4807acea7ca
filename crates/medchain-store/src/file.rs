use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreResult;
use crate::key;
use crate::traits::DocumentStore;

/// Filesystem-backed document store: one file per key under a root directory.
///
/// Writes go to a temporary file created next to the target, are flushed
/// (and `fsync`ed when `sync` is enabled), then renamed over the target.
/// Rename within one directory is atomic, so a crash mid-write leaves either
/// the previous document or the new one.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
    sync: bool,
}

impl FileDocumentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>, sync: bool) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, sync })
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a key. The key must already be validated.
    pub fn path_for(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |path, seg| path.join(seg))
    }

    /// Atomically write `data` to an arbitrary path.
    ///
    /// Shared by the store itself and by snapshot export.
    pub fn write_atomic(path: &Path, data: &[u8], sync: bool) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut tmp = NamedTempFile::new_in(&parent)?;
        tmp.write_all(data)?;
        tmp.flush()?;
        if sync {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;

        if sync {
            sync_dir(&parent)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

impl DocumentStore for FileDocumentStore {
    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        key::validate(key)?;
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        key::validate(key)?;
        let path = self.path_for(key);
        Self::write_atomic(&path, data, self.sync)?;
        debug!(key, bytes = data.len(), "document written");
        Ok(())
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        key::validate_prefix(prefix)?;
        let dir = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.path_for(prefix)
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            // Skip leftovers such as in-flight temporary files.
            if key::validate(&name).is_err() || name.starts_with('.') {
                continue;
            }
            keys.push(key::join(prefix, &name));
        }
        keys.sort();
        Ok(keys)
    }
}
