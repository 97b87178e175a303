//! Write one chain document to object storage.
//!
//! The document is serialized into a scoped temp file under the download
//! directory, uploaded to `{root}/{file_name}`, and the temp file is removed
//! when it goes out of scope whether or not the upload succeeded.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use ocm_schemas::FetchRecord;
use serde_json::Value;
use tracing::info;

use crate::key::ArtifactKey;
use crate::object_store::ObjectStore;
use crate::{CHAIN_DATA_TYPE, DATASETS_ROOT};

pub struct ArtifactPersister {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    download_dir: PathBuf,
    root: String,
    data_type: String,
}

impl ArtifactPersister {
    /// Chain snapshots under `datasets/`.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            download_dir: download_dir.into(),
            root: DATASETS_ROOT.to_string(),
            data_type: CHAIN_DATA_TYPE.to_string(),
        }
    }

    /// Upload `doc` for `symbol` and return the manifest record.
    ///
    /// `as_of` is the call time in the process timezone; the key stamp is
    /// derived from its UTC instant.
    pub fn persist(&self, symbol: &str, as_of: DateTime<FixedOffset>, doc: &Value) -> Result<FetchRecord> {
        let key = ArtifactKey::new(&self.data_type, symbol, as_of.with_timezone(&Utc));
        let file_name = key.file_name();
        let object_key = key.flat_key(&self.root);

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{}_", self.data_type))
            .suffix(".json")
            .tempfile_in(&self.download_dir)
            .with_context(|| {
                format!("temp file create failed in {}", self.download_dir.display())
            })?;

        serde_json::to_writer(tmp.as_file_mut(), doc).context("serialize chain document failed")?;
        tmp.as_file_mut().flush().context("flush temp file failed")?;

        self.store
            .upload(&self.bucket, &object_key, tmp.path())
            .with_context(|| format!("upload failed: {}/{}", self.bucket, object_key))?;

        tmp.close().context("temp file cleanup failed")?;

        info!(symbol, key = %object_key, "stored chain snapshot");

        Ok(FetchRecord {
            as_of,
            symbol: symbol.to_string(),
            file_name,
        })
    }
}
