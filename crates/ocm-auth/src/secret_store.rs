//! Durable secret-store boundary.
//!
//! Contract: `get_secret(name)` returns the stored JSON string, or `None` if the
//! name has no value; `update_secret(name, value)` overwrites it.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};

pub trait SecretStore: Send + Sync {
    fn get_secret(&self, name: &str) -> Result<Option<String>>;

    fn update_secret(&self, name: &str, value: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Secret store kept as one JSON object (`name -> value`) on disk.
///
/// Updates are written to a sibling temp file and renamed into place, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<root>/secrets.json`
    pub fn in_dir(root: &Path) -> Self {
        Self::new(root.join("secrets.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("secret store is not a JSON object: {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e)
                .with_context(|| format!("read secret store failed: {}", self.path.display())),
        }
    }
}

impl SecretStore for FileSecretStore {
    fn get_secret(&self, name: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(name))
    }

    fn update_secret(&self, name: &str, value: &str) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(name.to_string(), value.to_string());

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .with_context(|| format!("create secret store dir failed: {}", dir.display()))?;

        let json = serde_json::to_string_pretty(&all).context("serialize secret store failed")?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("create temp file failed in: {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .context("write secret store temp file failed")?;
        tmp.persist(&self.path)
            .map_err(|e| anyhow!("replace secret store failed: {}: {}", self.path.display(), e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local secret store for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    values: Mutex<BTreeMap<String, String>>,
    updates: Mutex<usize>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(name: &str, value: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert(name.to_string(), value.to_string());
        Self {
            values: Mutex::new(values),
            updates: Mutex::new(0),
        }
    }

    /// Number of `update_secret` calls served.
    pub fn update_count(&self) -> usize {
        self.updates.lock().map(|n| *n).unwrap_or(0)
    }
}

impl SecretStore for MemorySecretStore {
    fn get_secret(&self, name: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow!("memory secret store poisoned"))?;
        Ok(values.get(name).cloned())
    }

    fn update_secret(&self, name: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| anyhow!("memory secret store poisoned"))?
            .insert(name.to_string(), value.to_string());
        *self
            .updates
            .lock()
            .map_err(|_| anyhow!("memory secret store poisoned"))? += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::in_dir(dir.path());
        assert_eq!(store.get_secret("token").unwrap(), None);
    }

    #[test]
    fn file_store_update_preserves_other_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::in_dir(&dir.path().join("nested"));
        store.update_secret("a", "1").unwrap();
        store.update_secret("b", "2").unwrap();
        store.update_secret("a", "3").unwrap();
        assert_eq!(store.get_secret("a").unwrap().as_deref(), Some("3"));
        assert_eq!(store.get_secret("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn file_store_rejects_non_object_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::in_dir(dir.path());
        fs::write(store.path(), "[1,2,3]").unwrap();
        assert!(store.get_secret("a").is_err());
    }

    #[test]
    fn memory_store_counts_updates() {
        let store = MemorySecretStore::with_secret("t", "v0");
        store.update_secret("t", "v1").unwrap();
        assert_eq!(store.get_secret("t").unwrap().as_deref(), Some("v1"));
        assert_eq!(store.update_count(), 1);
    }
}
