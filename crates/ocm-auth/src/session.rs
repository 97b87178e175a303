//! OAuth exchanges against the provider's token endpoint.
//!
//! Two transitions, both ending in the same success path:
//! - **authorize**: one-time authorization code (from a pasted redirect URL)
//!   exchanged for a full credential. Weekly/manual only.
//! - **refresh**: current `refresh_token` exchanged for a new credential.
//!
//! Success path: the new credential goes to the [`TokenSink`] first; only when
//! the sink returns `Ok` does it replace the in-memory value. A sink failure
//! leaves the previous credential in place and surfaces as [`AuthError::Sink`].

use ocm_config::secrets::ProviderSecrets;
use ocm_config::ProviderEndpoints;
use ocm_schemas::Credential;
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::AuthError;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Durable persistence for freshly issued credentials.
pub trait TokenSink: Send + Sync {
    fn persist(&self, credential: &Credential) -> anyhow::Result<()>;
}

/// Source of the redirect URL the operator lands on after logging in at the
/// authorize URL. The CLI implements this over stdin.
pub trait RedirectPrompt {
    fn redirect_url(&self, authorize_url: &str) -> anyhow::Result<String>;
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct AuthSession {
    http: Client,
    endpoints: ProviderEndpoints,
    secrets: ProviderSecrets,
    credential: Option<Credential>,
    sink: Option<Box<dyn TokenSink>>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("endpoints", &self.endpoints)
            .field("secrets", &self.secrets)
            .field("credential", &self.credential)
            .field("sink", &self.sink.as_ref().map(|_| "<sink>"))
            .finish()
    }
}

enum Grant {
    AuthorizationCode,
    Refresh,
}

impl AuthSession {
    /// Build a session with its own blocking HTTP client using the configured timeout.
    pub fn new(
        endpoints: ProviderEndpoints,
        secrets: ProviderSecrets,
        credential: Option<Credential>,
        sink: Option<Box<dyn TokenSink>>,
    ) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(endpoints.timeout)
            .build()
            .map_err(|e| AuthError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self::with_http_client(http, endpoints, secrets, credential, sink))
    }

    pub fn with_http_client(
        http: Client,
        endpoints: ProviderEndpoints,
        secrets: ProviderSecrets,
        credential: Option<Credential>,
        sink: Option<Box<dyn TokenSink>>,
    ) -> Self {
        Self {
            http,
            endpoints,
            secrets,
            credential,
            sink,
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.credential.as_ref().map(|c| c.access_token.as_str())
    }

    /// URL the operator opens to log in and approve the app.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}",
            self.endpoints.authorize_base(),
            self.secrets.api_key,
            self.endpoints.redirect_uri
        )
    }

    /// Exchange the authorization code found in `redirect_url` for a new credential.
    pub fn authorize(&mut self, redirect_url: &str) -> Result<(), AuthError> {
        let code = extract_auth_code(redirect_url)?;
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", self.endpoints.redirect_uri.as_str()),
        ];
        let cred = self.exchange(&form, Grant::AuthorizationCode)?;
        self.install(cred)?;
        info!("authentication successful");
        Ok(())
    }

    /// Prompt for the redirect URL, then [`AuthSession::authorize`].
    pub fn authorize_interactive(&mut self, prompt: &dyn RedirectPrompt) -> Result<(), AuthError> {
        let url = self.authorize_url();
        let redirect = prompt
            .redirect_url(&url)
            .map_err(|e| AuthError::Transport(format!("redirect prompt failed: {e:#}")))?;
        self.authorize(&redirect)
    }

    /// Exchange the held refresh token for a new credential.
    ///
    /// A failure is terminal for the current call chain; callers must not loop.
    pub fn refresh(&mut self) -> Result<(), AuthError> {
        let refresh_token = self
            .credential
            .as_ref()
            .map(|c| c.refresh_token.clone())
            .ok_or_else(|| AuthError::CredentialUnavailable("no refresh token held".to_string()))?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("redirect_uri", self.endpoints.redirect_uri.as_str()),
        ];
        let cred = self.exchange(&form, Grant::Refresh)?;
        self.install(cred)?;
        info!("access token refreshed");
        Ok(())
    }

    fn exchange(&self, form: &[(&str, &str)], grant: Grant) -> Result<Credential, AuthError> {
        let resp = self
            .http
            .post(self.endpoints.token_url())
            .basic_auth(&self.secrets.api_key, Some(&self.secrets.api_secret))
            .form(form)
            .send()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let reason = reason_phrase(status);
            return Err(match grant {
                Grant::AuthorizationCode => AuthError::AuthExchangeFailed {
                    status: status.as_u16(),
                    reason,
                },
                Grant::Refresh => AuthError::TokenRefreshFailed {
                    status: status.as_u16(),
                    reason,
                    body: best_effort_json(resp),
                },
            });
        }

        resp.json::<Credential>()
            .map_err(|e| AuthError::Decode(e.to_string()))
    }

    fn install(&mut self, cred: Credential) -> Result<(), AuthError> {
        match &self.sink {
            Some(sink) => sink
                .persist(&cred)
                .map_err(|e| AuthError::Sink(format!("{e:#}")))?,
            None => warn!(
                "new access token fetched but no token sink provided; it will be lost on exit"
            ),
        }
        self.credential = Some(cred);
        Ok(())
    }
}

/// Pull the `code` query parameter out of the redirect URL.
///
/// The provider's code ends in `%40`; percent-decoding turns that into `@`,
/// which is the form the token endpoint expects.
pub fn extract_auth_code(redirect_url: &str) -> Result<String, AuthError> {
    let url = Url::parse(redirect_url.trim()).map_err(|_| AuthError::MissingAuthCode)?;
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingAuthCode)
}

pub(crate) fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("").to_string()
}

/// Parsed JSON error payload, or `None` if the body is not JSON.
pub fn best_effort_json(resp: Response) -> Option<Value> {
    resp.text()
        .ok()
        .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_code_is_percent_decoded() {
        let code = extract_auth_code(
            "https://127.0.0.1/?code=C0.b2F1dGgy%40&session=5f0b3c",
        )
        .unwrap();
        assert_eq!(code, "C0.b2F1dGgy@");
    }

    #[test]
    fn missing_code_is_rejected() {
        assert!(matches!(
            extract_auth_code("https://127.0.0.1/?session=abc"),
            Err(AuthError::MissingAuthCode)
        ));
        assert!(matches!(
            extract_auth_code("not a url"),
            Err(AuthError::MissingAuthCode)
        ));
    }
}
