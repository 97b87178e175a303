//! Bearer-authenticated GET client with a single bounded refresh-and-retry.
//!
//! Retry policy:
//! 1. No credential held: authorize interactively via the injected
//!    [`RedirectPrompt`] (bootstrap/manual contexts only).
//! 2. 200: return the parsed document.
//! 3. 401 on the first attempt: refresh once, retry once.
//! 4. Anything else, including a second 401: [`ClientError::ErrorCall`].

use std::sync::Arc;

use chrono_tz::Tz;
use ocm_auth::session::best_effort_json;
use ocm_auth::{AuthError, AuthSession, RedirectPrompt};
use ocm_schemas::{quote_params, ChainRequest, Clock, SystemClock};
use reqwest::blocking::Response;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ClientError;

pub struct MarketDataClient {
    session: AuthSession,
    base_url: String,
    prompt: Option<Box<dyn RedirectPrompt>>,
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl MarketDataClient {
    /// `tz` resolves "today" for chain requests without explicit dates.
    pub fn new(session: AuthSession, tz: Tz) -> Self {
        let base_url = session
            .endpoints()
            .md_base_url
            .trim_end_matches('/')
            .to_string();
        Self {
            session,
            base_url,
            prompt: None,
            clock: Arc::new(SystemClock),
            tz,
        }
    }

    /// Allow interactive authorization when no credential is held.
    pub fn with_prompt(mut self, prompt: Box<dyn RedirectPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// GET `{base}{path}` with `params` as the query string.
    pub fn call(&mut self, path: &str, params: &[(String, String)]) -> Result<Value, ClientError> {
        self.request(&Method::GET, path, params)
    }

    pub fn request(
        &mut self,
        method: &Method,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Value, ClientError> {
        if *method != Method::GET {
            return Err(ClientError::UnsupportedMethod(method.to_string()));
        }

        self.ensure_credential()?;

        let mut refreshed = false;
        loop {
            let resp = self.send_get(path, params)?;
            let status = resp.status();

            if status == StatusCode::OK {
                return resp
                    .json::<Value>()
                    .map_err(|e| ClientError::Decode(e.to_string()));
            }

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                debug!(path, "401 from provider; refreshing access token once");
                self.session.refresh()?;
                refreshed = true;
                continue;
            }

            return Err(error_call(status, resp));
        }
    }

    pub fn get_quotes(&mut self, symbols: &[String]) -> Result<Value, ClientError> {
        self.call("/quotes", &quote_params(symbols))
    }

    pub fn get_chain(&mut self, req: &ChainRequest) -> Result<Value, ClientError> {
        let today = self.clock.now_utc().with_timezone(&self.tz).date_naive();
        let params = req.query_params(today);
        info!(symbol = %req.symbol, "requesting option chain");
        self.call("/chains", &params)
    }

    fn ensure_credential(&mut self) -> Result<(), ClientError> {
        if self.session.credential().is_some() {
            return Ok(());
        }
        match &self.prompt {
            Some(prompt) => {
                self.session.authorize_interactive(prompt.as_ref())?;
                Ok(())
            }
            None => Err(ClientError::Auth(AuthError::CredentialUnavailable(
                "no credential held and no interactive prompt available".to_string(),
            ))),
        }
    }

    fn send_get(&self, path: &str, params: &[(String, String)]) -> Result<Response, ClientError> {
        let token = self.session.access_token().ok_or_else(|| {
            ClientError::Auth(AuthError::CredentialUnavailable(
                "no access token held".to_string(),
            ))
        })?;

        self.session
            .http()
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .query(params)
            .send()
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}

fn error_call(status: StatusCode, resp: Response) -> ClientError {
    ClientError::ErrorCall {
        status: status.as_u16(),
        reason: status
            .canonical_reason()
            .map_or_else(|| status.as_u16().to_string(), str::to_string),
        body: best_effort_json(resp),
    }
}
