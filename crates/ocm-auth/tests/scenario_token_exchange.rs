//! Token endpoint exchanges against a local mock provider.
//!
//! Coverage:
//! 1. refresh success: sink sees the new credential once, session replaces it
//! 2. refresh non-200: TokenRefreshFailed with parsed body, nothing replaced
//! 3. authorize success: decoded code posted, credential installed
//! 4. authorize non-200: AuthExchangeFailed
//! 5. sink failure: previous credential kept
//! 6. no sink: credential still installed in memory

use std::sync::{Arc, Mutex};

use httpmock::prelude::*;
use ocm_auth::{AuthError, AuthSession, Credential, TokenSink};
use ocm_config::secrets::ProviderSecrets;
use ocm_config::ProviderEndpoints;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// base64("test-key:test-secret")
const BASIC: &str = "Basic dGVzdC1rZXk6dGVzdC1zZWNyZXQ=";
const TOKEN_PATH: &str = "/v1/oauth/token";

#[derive(Clone, Default)]
struct RecordingSink {
    seen: Arc<Mutex<Vec<Credential>>>,
    fail: bool,
}

impl TokenSink for RecordingSink {
    fn persist(&self, credential: &Credential) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("secret store offline");
        }
        self.seen.lock().unwrap().push(credential.clone());
        Ok(())
    }
}

fn secrets() -> ProviderSecrets {
    ProviderSecrets {
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
    }
}

fn session(server: &MockServer, sink: Option<RecordingSink>) -> AuthSession {
    AuthSession::new(
        ProviderEndpoints::for_base_url(&server.base_url()),
        secrets(),
        Some(Credential::new("a0", "r0", "i0")),
        sink.map(|s| Box::new(s) as Box<dyn TokenSink>),
    )
    .unwrap()
}

fn new_tokens() -> serde_json::Value {
    json!({
        "access_token": "a1",
        "refresh_token": "r1",
        "id_token": "i1",
        "expires_in": 1800,
        "token_type": "Bearer"
    })
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[test]
fn refresh_success_invokes_sink_then_replaces_credential() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path(TOKEN_PATH)
            .header("Authorization", BASIC)
            .body_contains("grant_type=refresh_token")
            .body_contains("refresh_token=r0");
        then.status(200).json_body(new_tokens());
    });

    let sink = RecordingSink::default();
    let mut s = session(&server, Some(sink.clone()));
    s.refresh().unwrap();

    token.assert_hits(1);
    assert_eq!(s.credential(), Some(&Credential::new("a1", "r1", "i1")));
    let seen = sink.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].refresh_token, "r1");
}

#[test]
fn refresh_failure_carries_body_and_keeps_credential() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(TOKEN_PATH);
        then.status(400)
            .json_body(json!({"error": "invalid_grant", "error_description": "expired"}));
    });

    let sink = RecordingSink::default();
    let mut s = session(&server, Some(sink.clone()));
    let err = s.refresh().unwrap_err();

    match err {
        AuthError::TokenRefreshFailed {
            status,
            reason,
            body,
        } => {
            assert_eq!(status, 400);
            assert_eq!(reason, "Bad Request");
            assert_eq!(body.unwrap()["error"], "invalid_grant");
        }
        other => panic!("expected TokenRefreshFailed, got {other:?}"),
    }
    assert_eq!(s.access_token(), Some("a0"));
    assert!(sink.seen.lock().unwrap().is_empty());
}

#[test]
fn refresh_failure_with_non_json_body_has_no_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(TOKEN_PATH);
        then.status(503).body("upstream unavailable");
    });

    let mut s = session(&server, None);
    match s.refresh().unwrap_err() {
        AuthError::TokenRefreshFailed { status, body, .. } => {
            assert_eq!(status, 503);
            assert!(body.is_none());
        }
        other => panic!("expected TokenRefreshFailed, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Authorize
// ---------------------------------------------------------------------------

#[test]
fn authorize_posts_decoded_code_and_installs_credential() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path(TOKEN_PATH)
            .header("Authorization", BASIC)
            .body_contains("grant_type=authorization_code")
            // '@' is re-encoded by the form encoder
            .body_contains("code=C0.abc%40");
        then.status(200).json_body(new_tokens());
    });

    let sink = RecordingSink::default();
    let mut s = AuthSession::new(
        ProviderEndpoints::for_base_url(&server.base_url()),
        secrets(),
        None,
        Some(Box::new(sink.clone())),
    )
    .unwrap();
    s.authorize("https://127.0.0.1/?code=C0.abc%40&session=xyz")
        .unwrap();

    token.assert_hits(1);
    assert_eq!(s.access_token(), Some("a1"));
    assert_eq!(sink.seen.lock().unwrap().len(), 1);
}

#[test]
fn authorize_failure_is_auth_exchange_failed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(TOKEN_PATH);
        then.status(401);
    });

    let mut s = session(&server, None);
    let err = s
        .authorize("https://127.0.0.1/?code=C0.abc%40")
        .unwrap_err();
    assert!(
        matches!(err, AuthError::AuthExchangeFailed { status: 401, .. }),
        "got {err:?}"
    );
    assert_eq!(s.access_token(), Some("a0"));
}

#[test]
fn authorize_url_carries_client_id_and_redirect() {
    let server = MockServer::start();
    let s = session(&server, None);
    let url = s.authorize_url();
    assert!(url.starts_with(&format!("{}/v1/oauth/authorize?", server.base_url())));
    assert!(url.contains("client_id=test-key"));
    assert!(url.contains("redirect_uri=https://127.0.0.1"));
}

// ---------------------------------------------------------------------------
// Sink semantics
// ---------------------------------------------------------------------------

#[test]
fn sink_failure_keeps_previous_credential() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(TOKEN_PATH);
        then.status(200).json_body(new_tokens());
    });

    let sink = RecordingSink {
        fail: true,
        ..RecordingSink::default()
    };
    let mut s = session(&server, Some(sink));
    let err = s.refresh().unwrap_err();
    assert!(matches!(err, AuthError::Sink(_)), "got {err:?}");
    assert_eq!(s.credential(), Some(&Credential::new("a0", "r0", "i0")));
}

#[test]
fn missing_sink_still_installs_in_memory() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(TOKEN_PATH);
        then.status(200).json_body(new_tokens());
    });

    let mut s = session(&server, None);
    s.refresh().unwrap();
    assert_eq!(s.access_token(), Some("a1"));
}

#[test]
fn refresh_without_credential_is_unavailable() {
    let server = MockServer::start();
    let mut s = AuthSession::new(
        ProviderEndpoints::for_base_url(&server.base_url()),
        secrets(),
        None,
        None,
    )
    .unwrap();
    assert!(matches!(
        s.refresh().unwrap_err(),
        AuthError::CredentialUnavailable(_)
    ));
}
