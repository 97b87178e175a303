//! Credential persistence: local cache first, secret store as source of truth.
//!
//! `load` reads the cache file before the secret store (fast path on a
//! process restart without a redeploy). `save` always writes the secret store
//! and mirrors into the cache only when caching is enabled.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ocm_config::AppConfig;
use ocm_schemas::Credential;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::secret_store::SecretStore;
use crate::session::TokenSink;

#[derive(Clone)]
pub struct TokenStore {
    secrets: Arc<dyn SecretStore>,
    secret_name: String,
    cache_path: PathBuf,
    cache_enabled: bool,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("secret_name", &self.secret_name)
            .field("cache_path", &self.cache_path)
            .field("cache_enabled", &self.cache_enabled)
            .finish()
    }
}

impl TokenStore {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        secret_name: impl Into<String>,
        cache_path: impl Into<PathBuf>,
        cache_enabled: bool,
    ) -> Self {
        Self {
            secrets,
            secret_name: secret_name.into(),
            cache_path: cache_path.into(),
            cache_enabled,
        }
    }

    pub fn from_config(cfg: &AppConfig, secrets: Arc<dyn SecretStore>) -> anyhow::Result<Self> {
        Ok(Self::new(
            secrets,
            cfg.require_token_secret_name()?,
            cfg.token_cache_path.clone(),
            cfg.cache_token_locally,
        ))
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Load the live credential.
    ///
    /// # Errors
    /// - [`AuthError::CredentialUnavailable`] when no source has a value.
    /// - [`AuthError::CredentialMalformed`] when the secret-store value does not decode.
    /// - [`AuthError::Store`] on backend IO failure.
    pub fn load(&self) -> Result<Credential, AuthError> {
        if let Some(cred) = self.read_cache()? {
            debug!(path = %self.cache_path.display(), "credential loaded from local cache");
            return Ok(cred);
        }

        let raw = self
            .secrets
            .get_secret(&self.secret_name)
            .map_err(|e| AuthError::Store(format!("{e:#}")))?
            .ok_or_else(|| {
                AuthError::CredentialUnavailable(format!(
                    "no value in local cache or secret '{}'",
                    self.secret_name
                ))
            })?;

        let cred: Credential =
            serde_json::from_str(&raw).map_err(|e| AuthError::CredentialMalformed {
                origin: format!("secret '{}'", self.secret_name),
                detail: e.to_string(),
            })?;

        if self.cache_enabled {
            self.write_cache(&cred)?;
        }

        Ok(cred)
    }

    /// Persist a new credential. Secret store first, then the cache (if enabled).
    pub fn save(&self, cred: &Credential) -> Result<(), AuthError> {
        let json = serde_json::to_string(cred).map_err(|e| AuthError::Store(e.to_string()))?;
        self.secrets
            .update_secret(&self.secret_name, &json)
            .map_err(|e| AuthError::Store(format!("{e:#}")))?;

        if self.cache_enabled {
            self.write_cache(cred)?;
        }

        info!(secret = %self.secret_name, "new access token value updated");
        Ok(())
    }

    /// A cache file that exists but does not decode is ignored with a warning
    /// and the secret store is consulted instead.
    fn read_cache(&self) -> Result<Option<Credential>, AuthError> {
        let raw = match fs::read_to_string(&self.cache_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::Store(format!(
                    "read token cache failed: {}: {e}",
                    self.cache_path.display()
                )))
            }
        };

        match serde_json::from_str(&raw) {
            Ok(cred) => Ok(Some(cred)),
            Err(e) => {
                warn!(
                    path = %self.cache_path.display(),
                    error = %e,
                    "local token cache is malformed; falling back to secret store"
                );
                Ok(None)
            }
        }
    }

    fn write_cache(&self, cred: &Credential) -> Result<(), AuthError> {
        let json = serde_json::to_string(cred).map_err(|e| AuthError::Store(e.to_string()))?;
        fs::write(&self.cache_path, json).map_err(|e| {
            AuthError::Store(format!(
                "write token cache failed: {}: {e}",
                self.cache_path.display()
            ))
        })
    }
}

impl TokenSink for TokenStore {
    fn persist(&self, credential: &Credential) -> anyhow::Result<()> {
        self.save(credential)?;
        Ok(())
    }
}
