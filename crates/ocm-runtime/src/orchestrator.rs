//! Per-symbol fetch loop.
//!
//! Calls are sequential and in input order. A structured per-symbol provider
//! error (`errors[]` or `error_description` in the body) is logged and the
//! loop moves on; any other failure aborts the batch.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use ocm_md::{ChainFetcher, ClientError};
use ocm_schemas::{ChainRequest, Clock, FetchRecord};
use ocm_storage::ArtifactPersister;
use serde_json::Value;
use tracing::{error, info};

use crate::market_hours::MarketWindow;

/// How a chain call failure is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainFailure {
    /// Provider explained the failure for this symbol; skip it.
    Skip { status: u16, details: Vec<String> },
    /// Unrecognized failure; abort the batch.
    Fatal,
}

/// Classify a chain call error.
///
/// Only `ErrorCall` with a recognizable body is skippable.
pub fn classify_chain_error(err: &ClientError) -> ChainFailure {
    let ClientError::ErrorCall {
        status,
        body: Some(body),
        ..
    } = err
    else {
        return ChainFailure::Fatal;
    };

    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let details = errors
            .iter()
            .map(|e| match e.get("detail") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => e.to_string(),
            })
            .collect();
        return ChainFailure::Skip {
            status: *status,
            details,
        };
    }

    match body.get("error_description") {
        Some(Value::String(s)) => ChainFailure::Skip {
            status: *status,
            details: vec![s.clone()],
        },
        Some(other) => ChainFailure::Skip {
            status: *status,
            details: vec![other.to_string()],
        },
        None => ChainFailure::Fatal,
    }
}

pub struct FetchOrchestrator {
    clock: Arc<dyn Clock>,
    /// Process timezone used to stamp `asOf`.
    tz: Tz,
    window: MarketWindow,
    persister: Option<ArtifactPersister>,
}

impl FetchOrchestrator {
    pub fn new(clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self {
            clock,
            tz,
            window: MarketWindow::default(),
            persister: None,
        }
    }

    pub fn with_persister(mut self, persister: ArtifactPersister) -> Self {
        self.persister = Some(persister);
        self
    }

    /// Market-hours gate. Always `true` when `on_hours_only` is unset.
    pub fn should_run(&self, on_hours_only: bool) -> bool {
        if !on_hours_only {
            return true;
        }
        let now = self.clock.now_utc();
        let open = self.window.contains(now);
        if !open {
            info!(now = %self.window.local(now), "running off hours, skipping calls");
        }
        open
    }

    /// Gate, then fetch every symbol.
    pub fn run(
        &self,
        fetcher: &mut dyn ChainFetcher,
        symbols: &[String],
        on_hours_only: bool,
        persist: bool,
    ) -> Result<Vec<FetchRecord>> {
        if !self.should_run(on_hours_only) {
            return Ok(Vec::new());
        }
        self.run_symbols(fetcher, symbols, persist)
    }

    /// The per-symbol loop without the gate. Callers that already consulted
    /// [`FetchOrchestrator::should_run`] use this directly.
    pub fn run_symbols(
        &self,
        fetcher: &mut dyn ChainFetcher,
        symbols: &[String],
        persist: bool,
    ) -> Result<Vec<FetchRecord>> {
        if symbols.is_empty() {
            error!("no symbols provided, nothing to call");
            return Ok(Vec::new());
        }

        let persister = match (persist, &self.persister) {
            (true, Some(p)) => Some(p),
            (true, None) => bail!("CONFIG_MISSING: persist requested but no artifact persister configured"),
            (false, _) => None,
        };

        let mut records = Vec::new();
        for symbol in symbols {
            let as_of = self.as_of();
            info!(symbol = %symbol, as_of = %as_of, "getting chain");

            let doc = match fetcher.get_chain(&ChainRequest::for_symbol(symbol)) {
                Ok(doc) => doc,
                Err(err) => match classify_chain_error(&err) {
                    ChainFailure::Skip { status, details } => {
                        for detail in &details {
                            error!(symbol = %symbol, status, detail = %detail, "get chain call failed");
                        }
                        continue;
                    }
                    ChainFailure::Fatal => {
                        return Err(anyhow::Error::new(err)
                            .context(format!("chain call failed for {symbol}")));
                    }
                },
            };

            if let Some(p) = persister {
                records.push(p.persist(symbol, as_of, &doc)?);
            }
        }

        Ok(records)
    }

    fn as_of(&self) -> DateTime<FixedOffset> {
        self.clock.now_utc().with_timezone(&self.tz).fixed_offset()
    }
}
