//! Object-storage boundary.
//!
//! Contract (mirrors a bucket/key store):
//! - `list_page`: keys under `prefix`, ascending, strictly after `start_after`,
//!   at most `max_keys` per page. An empty page means the listing is exhausted.
//! - `upload`: put a local file at `bucket/key`.
//! - `copy`: duplicate `src` to `dst` within a bucket.
//! - `delete`: remove `bucket/key`; deleting a missing key is not an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

pub trait ObjectStore: Send + Sync {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<Vec<ObjectInfo>>;

    fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()>;

    fn copy(&self, bucket: &str, src_key: &str, dst_key: &str) -> Result<()>;

    fn delete(&self, bucket: &str, key: &str) -> Result<()>;
}

fn select_page<I>(keys: I, prefix: &str, start_after: Option<&str>, max_keys: usize) -> Vec<ObjectInfo>
where
    I: IntoIterator<Item = ObjectInfo>,
{
    let mut out: Vec<ObjectInfo> = keys
        .into_iter()
        .filter(|o| o.key.starts_with(prefix))
        .filter(|o| start_after.map_or(true, |after| o.key.as_str() > after))
        .collect();
    out.sort_by(|a, b| a.key.cmp(&b.key));
    out.truncate(max_keys);
    out
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Buckets are directories under `root`; keys are `/`-separated relative paths.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        let ok = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !ok || bucket.is_empty() || bucket.contains('/') {
            bail!("invalid object location: bucket='{bucket}' key='{key}'");
        }
        Ok(self.root.join(bucket).join(rel))
    }

    /// Collect files under `dir` whose key starts with `prefix`. Only
    /// subdirectories that can hold such keys are entered.
    fn walk(dir: &Path, rel: &str, prefix: &str, out: &mut Vec<ObjectInfo>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).with_context(|| format!("list dir failed: {}", dir.display())),
        };
        for entry in entries {
            let entry = entry.with_context(|| format!("list dir failed: {}", dir.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = if rel.is_empty() {
                name
            } else {
                format!("{rel}/{name}")
            };
            let meta = entry
                .metadata()
                .with_context(|| format!("stat failed: {}", entry.path().display()))?;
            if meta.is_dir() {
                let dir_key = format!("{key}/");
                if dir_key.starts_with(prefix) || prefix.starts_with(&dir_key) {
                    Self::walk(&entry.path(), &key, prefix, out)?;
                }
            } else if key.starts_with(prefix) {
                out.push(ObjectInfo {
                    key,
                    size: meta.len(),
                });
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<Vec<ObjectInfo>> {
        // Directory part of the prefix; `datasets/CHAIN_` starts at `datasets`.
        let base = prefix.rsplit_once('/').map_or("", |(dir, _)| dir);
        let mut start = self.root.join(bucket);
        if !base.is_empty() {
            if !Path::new(base).components().all(|c| matches!(c, Component::Normal(_))) {
                bail!("invalid list prefix: bucket='{bucket}' prefix='{prefix}'");
            }
            start = start.join(base);
        }

        let mut all = Vec::new();
        Self::walk(&start, base, prefix, &mut all)?;
        Ok(select_page(all, prefix, start_after, max_keys))
    }

    fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let dst = self.object_path(bucket, key)?;
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir failed: {}", parent.display()))?;
        }
        fs::copy(local_path, &dst).with_context(|| {
            format!("upload failed: {} -> {}", local_path.display(), dst.display())
        })?;
        Ok(())
    }

    fn copy(&self, bucket: &str, src_key: &str, dst_key: &str) -> Result<()> {
        let src = self.object_path(bucket, src_key)?;
        self.upload(bucket, dst_key, &src)
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("delete failed: {}", path.display())),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<(String, String), Vec<u8>>,
    uploads: usize,
    copies: usize,
    deletes: usize,
}

/// Process-local object store for dry runs and tests. Counts mutating calls.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    state: Mutex<MemoryState>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory object store poisoned"))
    }

    /// Seed an object without counting it as an upload.
    pub fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
        self.lock()?
            .objects
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
        Ok(())
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .ok()?
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All keys of `bucket`, ascending.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        match self.lock() {
            Ok(st) => st
                .objects
                .keys()
                .filter(|(b, _)| b == bucket)
                .map(|(_, k)| k.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn upload_count(&self) -> usize {
        self.lock().map(|s| s.uploads).unwrap_or(0)
    }

    pub fn copy_count(&self) -> usize {
        self.lock().map(|s| s.copies).unwrap_or(0)
    }

    pub fn delete_count(&self) -> usize {
        self.lock().map(|s| s.deletes).unwrap_or(0)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<Vec<ObjectInfo>> {
        let st = self.lock()?;
        let in_bucket = st
            .objects
            .iter()
            .filter(|((b, _), _)| b == bucket)
            .map(|((_, k), v)| ObjectInfo {
                key: k.clone(),
                size: v.len() as u64,
            });
        Ok(select_page(in_bucket, prefix, start_after, max_keys))
    }

    fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<()> {
        let bytes = fs::read(local_path)
            .with_context(|| format!("read upload source failed: {}", local_path.display()))?;
        let mut st = self.lock()?;
        st.objects
            .insert((bucket.to_string(), key.to_string()), bytes);
        st.uploads += 1;
        Ok(())
    }

    fn copy(&self, bucket: &str, src_key: &str, dst_key: &str) -> Result<()> {
        let mut st = self.lock()?;
        let bytes = st
            .objects
            .get(&(bucket.to_string(), src_key.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("copy source not found: {bucket}/{src_key}"))?;
        st.objects
            .insert((bucket.to_string(), dst_key.to_string()), bytes);
        st.copies += 1;
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let mut st = self.lock()?;
        st.objects.remove(&(bucket.to_string(), key.to_string()));
        st.deletes += 1;
        Ok(())
    }
}
