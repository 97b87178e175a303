//! Entry-point wiring.
//!
//! Each workflow takes the process [`AppConfig`], the resolved provider
//! secrets and a [`Backends`] bundle, and assembles the components it needs.

use std::sync::Arc;

use anyhow::{Context, Result};
use ocm_auth::{AuthError, AuthSession, FileSecretStore, MemorySecretStore, RedirectPrompt, SecretStore, TokenStore};
use ocm_config::secrets::ProviderSecrets;
use ocm_config::AppConfig;
use ocm_md::MarketDataClient;
use ocm_schedule::{FileTriggerService, MemoryTriggerService, RuleToggle, ScheduleController, TriggerService};
use ocm_schemas::{Clock, FetchRecord};
use ocm_storage::{ArtifactPersister, DataReorganizer, FsObjectStore, MemoryObjectStore, ObjectStore, ReorganizeReport};
use serde_json::Value;
use tracing::info;

use crate::orchestrator::FetchOrchestrator;

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// The three external collaborators, behind their contracts.
#[derive(Clone)]
pub struct Backends {
    pub secrets: Arc<dyn SecretStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub triggers: Arc<dyn TriggerService>,
}

impl Backends {
    /// File-backed backends rooted at `{OCM_BACKEND_ROOT}/{profile}`.
    pub fn file_backed(cfg: &AppConfig) -> Self {
        let storage = cfg.storage_root();
        Self {
            secrets: Arc::new(FileSecretStore::in_dir(&storage)),
            objects: Arc::new(FsObjectStore::new(storage.join("buckets"))),
            triggers: Arc::new(FileTriggerService::in_dir(&cfg.trigger_root())),
        }
    }

    /// Empty process-local backends.
    pub fn in_memory() -> Self {
        Self {
            secrets: Arc::new(MemorySecretStore::new()),
            objects: Arc::new(MemoryObjectStore::new()),
            triggers: Arc::new(MemoryTriggerService::unavailable()),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip the run outside market hours.
    pub on_hours_only: bool,
    /// Upload each document and return its record. `false` is a dry run.
    pub persist: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            on_hours_only: true,
            persist: true,
        }
    }
}

/// Scheduled fetch: gate, load credential, fetch each configured symbol.
///
/// Off hours this returns before any backend or network access.
pub fn fetch_workflow(
    cfg: &AppConfig,
    secrets: &ProviderSecrets,
    backends: &Backends,
    clock: Arc<dyn Clock>,
    opts: FetchOptions,
) -> Result<Vec<FetchRecord>> {
    let mut orchestrator = FetchOrchestrator::new(clock.clone(), cfg.process_tz);
    if !orchestrator.should_run(opts.on_hours_only) {
        return Ok(Vec::new());
    }

    let tokens = TokenStore::from_config(cfg, backends.secrets.clone())?;
    let credential = tokens.load().context("load stored credential failed")?;
    let session = AuthSession::new(
        cfg.provider.clone(),
        secrets.clone(),
        Some(credential),
        Some(Box::new(tokens)),
    )?;
    let mut client = MarketDataClient::new(session, cfg.process_tz).with_clock(clock);

    if opts.persist {
        let persister = ArtifactPersister::new(
            backends.objects.clone(),
            cfg.require_bucket()?,
            cfg.download_dir.clone(),
        );
        orchestrator = orchestrator.with_persister(persister);
    }

    let records = orchestrator.run_symbols(&mut client, &cfg.symbols, opts.persist)?;
    info!(count = records.len(), "fetch complete");
    Ok(records)
}

// ---------------------------------------------------------------------------
// Weekly re-authorization
// ---------------------------------------------------------------------------

/// Authorize from scratch, persist the credential, then re-enable the trigger.
pub fn weekly_refresh_workflow(
    cfg: &AppConfig,
    secrets: &ProviderSecrets,
    backends: &Backends,
    prompt: &dyn RedirectPrompt,
) -> Result<RuleToggle> {
    let tokens = TokenStore::from_config(cfg, backends.secrets.clone())?;
    let mut session = AuthSession::new(cfg.provider.clone(), secrets.clone(), None, Some(Box::new(tokens)))?;
    session
        .authorize_interactive(prompt)
        .context("weekly authorization failed")?;

    let toggle = ScheduleController::new(backends.triggers.clone(), cfg.trigger_markers.clone())
        .enable_for_refresh()
        .context("enable trigger rule failed")?;
    Ok(toggle)
}

/// Stop scheduled fetches ahead of the weekly step.
pub fn disable_trigger_workflow(cfg: &AppConfig, backends: &Backends) -> Result<RuleToggle> {
    let toggle = ScheduleController::new(backends.triggers.clone(), cfg.trigger_markers.clone())
        .disable()
        .context("disable trigger rule failed")?;
    Ok(toggle)
}

// ---------------------------------------------------------------------------
// Maintenance and manual calls
// ---------------------------------------------------------------------------

pub fn reorganize_workflow(
    cfg: &AppConfig,
    backends: &Backends,
    prefix: &str,
    page_size: usize,
) -> Result<ReorganizeReport> {
    let bucket = cfg.require_bucket()?;
    DataReorganizer::new(backends.objects.clone())
        .with_page_size(page_size)
        .reorganize(bucket, prefix)
}

/// Manual quote call. Authorizes through `prompt` when no credential is stored.
pub fn quotes_workflow(
    cfg: &AppConfig,
    secrets: &ProviderSecrets,
    backends: &Backends,
    symbols: &[String],
    prompt: Box<dyn RedirectPrompt>,
) -> Result<Value> {
    let tokens = TokenStore::from_config(cfg, backends.secrets.clone())?;
    let credential = match tokens.load() {
        Ok(c) => Some(c),
        Err(AuthError::CredentialUnavailable(detail)) => {
            info!(%detail, "no stored credential, authorizing interactively");
            None
        }
        Err(e) => return Err(e).context("load stored credential failed"),
    };

    let session = AuthSession::new(cfg.provider.clone(), secrets.clone(), credential, Some(Box::new(tokens)))?;
    let mut client = MarketDataClient::new(session, cfg.process_tz).with_prompt(prompt);
    let doc = client.get_quotes(symbols).context("quotes call failed")?;
    Ok(doc)
}

/// URL the operator opens to approve the app.
pub fn authorize_url(cfg: &AppConfig, secrets: &ProviderSecrets) -> Result<String> {
    let session = AuthSession::new(cfg.provider.clone(), secrets.clone(), None, None)?;
    Ok(session.authorize_url())
}
