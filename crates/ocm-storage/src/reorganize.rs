//! Move flat-layout artifacts into the date-partitioned layout.
//!
//! Pages are requested with `start_after` set to the last key of the previous
//! page, so keys copied into the partitioned layout never shift the cursor.
//! Each object is copied then deleted; a key already in its partitioned form
//! is left alone. Unparseable keys are recorded and skipped; storage errors
//! abort the run.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::key::partitioned_key_for;
use crate::object_store::ObjectStore;

pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReorganizeReport {
    pub moved: usize,
    pub unchanged: usize,
    /// `(key, reason)` for keys that could not be parsed.
    pub failed: Vec<(String, String)>,
}

pub struct DataReorganizer {
    store: Arc<dyn ObjectStore>,
    page_size: usize,
}

impl DataReorganizer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn reorganize(&self, bucket: &str, prefix: &str) -> Result<ReorganizeReport> {
        let mut report = ReorganizeReport::default();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .store
                .list_page(bucket, prefix, cursor.as_deref(), self.page_size)
                .with_context(|| format!("list failed: {bucket}/{prefix}"))?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(last.key.clone());

            for obj in &page {
                let target = match partitioned_key_for(&obj.key) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(key = %obj.key, error = %e, "skipping unparseable key");
                        report.failed.push((obj.key.clone(), e.reason.to_string()));
                        continue;
                    }
                };

                if target == obj.key {
                    report.unchanged += 1;
                    continue;
                }

                self.store
                    .copy(bucket, &obj.key, &target)
                    .with_context(|| format!("copy failed: {} -> {}", obj.key, target))?;
                self.store
                    .delete(bucket, &obj.key)
                    .with_context(|| format!("delete failed: {}", obj.key))?;
                debug!(from = %obj.key, to = %target, "moved");
                report.moved += 1;
            }
        }

        info!(
            bucket,
            prefix,
            moved = report.moved,
            unchanged = report.unchanged,
            failed = report.failed.len(),
            "reorganize complete"
        );
        Ok(report)
    }
}
