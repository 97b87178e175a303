//! Provider client-credential resolution.
//!
//! The OAuth client id/secret are the only secrets read from the environment.
//! The credential triple itself lives in the secret store (see `ocm-auth`).
//!
//! `Debug` on [`ProviderSecrets`] **redacts** values; errors reference the env
//! var **NAME** only.

use anyhow::{bail, Result};

pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_API_SECRET: &str = "API_SECRET";

/// OAuth client credentials used for HTTP Basic auth on the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSecrets {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for ProviderSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSecrets")
            .field("api_key", &"<REDACTED>")
            .field("api_secret", &"<REDACTED>")
            .finish()
    }
}

fn resolve(lookup: &dyn Fn(&str) -> Option<String>, var_name: &str) -> Option<String> {
    match lookup(var_name) {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve `API_KEY` and `API_SECRET`; both are required.
pub fn resolve_provider_secrets<F>(lookup: F) -> Result<ProviderSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(api_key) = resolve(&lookup, ENV_API_KEY) else {
        bail!("SECRETS_MISSING: required env var '{ENV_API_KEY}' (client id) is not set or empty");
    };
    let Some(api_secret) = resolve(&lookup, ENV_API_SECRET) else {
        bail!(
            "SECRETS_MISSING: required env var '{ENV_API_SECRET}' (client secret) is not set or empty"
        );
    };
    Ok(ProviderSecrets { api_key, api_secret })
}

/// Resolve from the real process environment.
pub fn resolve_provider_secrets_from_env() -> Result<ProviderSecrets> {
    resolve_provider_secrets(|name| std::env::var(name).ok())
}
