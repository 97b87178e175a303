//! ocm-config
//!
//! Environment-derived process configuration, built **once** at startup and
//! passed by reference into every component constructor.
//!
//! # Contract
//! - Never scatter `std::env::var` calls across the codebase; read through
//!   [`AppConfig::from_env`] (or [`AppConfig::from_lookup`] in tests).
//! - Secrets (`API_KEY`, `API_SECRET`) are resolved separately by
//!   [`secrets::resolve_provider_secrets`] and are redacted in `Debug`.
//! - Error messages name the env var, never its value.

pub mod secrets;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chrono_tz::Tz;

// ---------------------------------------------------------------------------
// Env var names
// ---------------------------------------------------------------------------

pub const ENV_DOWNLOAD_DIR: &str = "DOWNLOAD_DIR";
pub const ENV_BUCKET: &str = "S3_BUCKET_NAME";
pub const ENV_QUOTES_LIST: &str = "QUOTES_LIST";
pub const ENV_TZ_NAME: &str = "TZ_NAME";
pub const ENV_SAVE_IN_FILE: &str = "SAVE_IN_FILE";
pub const ENV_TOKEN_CACHE_PATH: &str = "TOKEN_CACHE_PATH";
pub const ENV_TOKEN_SECRET: &str = "ACCESS_TOKEN_SECRET";
pub const ENV_STORAGE_PROFILE: &str = "AWS_PROFILE_NAME";
pub const ENV_TRIGGER_PROFILE: &str = "AWS_PROFILE";
pub const ENV_BACKEND_ROOT: &str = "OCM_BACKEND_ROOT";
pub const ENV_MD_BASE_URL: &str = "MD_BASE_URL";
pub const ENV_OAUTH_BASE_URL: &str = "OAUTH_BASE_URL";
pub const ENV_REDIRECT_URI: &str = "REDIRECT_URI";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
pub const ENV_TRIGGER_MARKERS: &str = "TRIGGER_RULE_MARKERS";

pub const DEFAULT_MD_BASE_URL: &str = "https://api.schwabapi.com/marketdata/v1";
pub const DEFAULT_OAUTH_BASE_URL: &str = "https://api.schwabapi.com/v1/oauth";
pub const DEFAULT_REDIRECT_URI: &str = "https://127.0.0.1";
pub const DEFAULT_TRIGGER_MARKERS: &[&str] = &["charles", "schwab"];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Provider endpoint settings. No secrets here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    /// Market-data base, e.g. `https://api.schwabapi.com/marketdata/v1`.
    pub md_base_url: String,
    /// OAuth base; `/authorize` and `/token` are appended.
    pub oauth_base_url: String,
    pub redirect_uri: String,
    /// Per-request timeout applied by the HTTP transport.
    pub timeout: Duration,
}

impl ProviderEndpoints {
    pub fn token_url(&self) -> String {
        format!("{}/token", self.oauth_base_url.trim_end_matches('/'))
    }

    pub fn authorize_base(&self) -> String {
        format!("{}/authorize", self.oauth_base_url.trim_end_matches('/'))
    }

    /// Endpoints pointing at a local mock server; used by tests.
    pub fn for_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            md_base_url: format!("{base}/marketdata/v1"),
            oauth_base_url: format!("{base}/v1/oauth"),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            md_base_url: DEFAULT_MD_BASE_URL.to_string(),
            oauth_base_url: DEFAULT_OAUTH_BASE_URL.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Process configuration for one collector invocation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Scratch directory for artifact temp files.
    pub download_dir: PathBuf,
    /// Object-storage bucket. Required by persisting/reorganizing commands only.
    pub bucket: Option<String>,
    /// Symbols to fetch, in order. Empty when `QUOTES_LIST` is unset.
    pub symbols: Vec<String>,
    /// Timezone used to stamp `asOf` and resolve default chain dates.
    pub process_tz: Tz,
    /// Mirror the credential into the local cache file.
    pub cache_token_locally: bool,
    pub token_cache_path: PathBuf,
    /// Secret-store name holding the credential JSON.
    pub token_secret_name: Option<String>,
    /// Backend identity for the secret store and object storage.
    pub storage_profile: String,
    /// Backend identity for the trigger service.
    pub trigger_profile: String,
    /// Root of the file-backed backends.
    pub backend_root: PathBuf,
    pub provider: ProviderEndpoints,
    /// Every marker must appear in the trigger rule's name.
    pub trigger_markers: Vec<String>,
}

impl AppConfig {
    /// Build from the real process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary name → value lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let process_tz = match get(ENV_TZ_NAME) {
            Some(name) => name.parse::<Tz>().map_err(|_| {
                anyhow!("CONFIG_INVALID: env var '{ENV_TZ_NAME}' is not an IANA timezone name")
            })?,
            None => Tz::UTC,
        };

        let timeout = match get(ENV_HTTP_TIMEOUT_SECS) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    anyhow!(
                        "CONFIG_INVALID: env var '{ENV_HTTP_TIMEOUT_SECS}' must be a whole number of seconds"
                    )
                })?;
                if secs == 0 {
                    bail!("CONFIG_INVALID: env var '{ENV_HTTP_TIMEOUT_SECS}' must be > 0");
                }
                Duration::from_secs(secs)
            }
            None => ProviderEndpoints::default().timeout,
        };

        let trigger_markers = match get(ENV_TRIGGER_MARKERS) {
            Some(raw) => {
                let markers = split_list(&raw);
                if markers.is_empty() {
                    bail!("CONFIG_INVALID: env var '{ENV_TRIGGER_MARKERS}' lists no markers");
                }
                markers
            }
            None => DEFAULT_TRIGGER_MARKERS.iter().map(|m| m.to_string()).collect(),
        };

        Ok(Self {
            download_dir: PathBuf::from(get(ENV_DOWNLOAD_DIR).unwrap_or_else(|| "/tmp".into())),
            bucket: get(ENV_BUCKET),
            symbols: get(ENV_QUOTES_LIST)
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            process_tz,
            cache_token_locally: get(ENV_SAVE_IN_FILE)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            token_cache_path: PathBuf::from(
                get(ENV_TOKEN_CACHE_PATH).unwrap_or_else(|| ".access_token.json".into()),
            ),
            token_secret_name: get(ENV_TOKEN_SECRET),
            storage_profile: get(ENV_STORAGE_PROFILE).unwrap_or_else(|| "default".into()),
            trigger_profile: get(ENV_TRIGGER_PROFILE).unwrap_or_else(|| "default".into()),
            backend_root: PathBuf::from(get(ENV_BACKEND_ROOT).unwrap_or_else(|| ".ocm".into())),
            provider: ProviderEndpoints {
                md_base_url: get(ENV_MD_BASE_URL).unwrap_or_else(|| DEFAULT_MD_BASE_URL.into()),
                oauth_base_url: get(ENV_OAUTH_BASE_URL)
                    .unwrap_or_else(|| DEFAULT_OAUTH_BASE_URL.into()),
                redirect_uri: get(ENV_REDIRECT_URI).unwrap_or_else(|| DEFAULT_REDIRECT_URI.into()),
                timeout,
            },
            trigger_markers,
        })
    }

    pub fn require_bucket(&self) -> Result<&str> {
        self.bucket
            .as_deref()
            .ok_or_else(|| anyhow!("CONFIG_MISSING: required env var '{ENV_BUCKET}' is not set or empty"))
    }

    pub fn require_token_secret_name(&self) -> Result<&str> {
        self.token_secret_name.as_deref().ok_or_else(|| {
            anyhow!("CONFIG_MISSING: required env var '{ENV_TOKEN_SECRET}' is not set or empty")
        })
    }

    /// Directory of the file-backed secret store and object storage.
    pub fn storage_root(&self) -> PathBuf {
        self.backend_root.join(&self.storage_profile)
    }

    /// Directory of the file-backed trigger service.
    pub fn trigger_root(&self) -> PathBuf {
        self.backend_root.join(&self.trigger_profile)
    }
}

/// Split a comma-separated list, trimming entries and dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
