use std::fmt;

use serde_json::Value;

/// Errors raised while obtaining, refreshing or storing the credential.
#[derive(Debug)]
pub enum AuthError {
    /// Neither the local cache nor the secret store holds a credential.
    CredentialUnavailable(String),
    /// A stored credential exists but does not decode.
    CredentialMalformed { origin: String, detail: String },
    /// The pasted redirect URL carries no `code` parameter.
    MissingAuthCode,
    /// Authorization-code exchange returned non-200.
    AuthExchangeFailed { status: u16, reason: String },
    /// Refresh-token exchange returned non-200. Not retryable within a call chain.
    TokenRefreshFailed {
        status: u16,
        reason: String,
        body: Option<Value>,
    },
    /// Network or transport failure talking to the token endpoint.
    Transport(String),
    /// A 200 token response could not be decoded.
    Decode(String),
    /// The token sink failed; the new credential was not installed.
    Sink(String),
    /// Secret-store or cache IO failed.
    Store(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::CredentialUnavailable(detail) => {
                write!(f, "credential unavailable: {detail}")
            }
            AuthError::CredentialMalformed { origin, detail } => {
                write!(f, "credential in {origin} is malformed: {detail}")
            }
            AuthError::MissingAuthCode => {
                write!(f, "redirect url does not contain an authorization code")
            }
            AuthError::AuthExchangeFailed { status, reason } => {
                write!(f, "auth request failed [{status}]: {reason}")
            }
            AuthError::TokenRefreshFailed { status, reason, .. } => {
                write!(f, "token refresh failed [{status}]: {reason}")
            }
            AuthError::Transport(msg) => write!(f, "token endpoint transport error: {msg}"),
            AuthError::Decode(msg) => write!(f, "token response decode error: {msg}"),
            AuthError::Sink(msg) => write!(f, "token sink failed: {msg}"),
            AuthError::Store(msg) => write!(f, "credential store error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_refresh_failure_omits_body() {
        let err = AuthError::TokenRefreshFailed {
            status: 400,
            reason: "Bad Request".to_string(),
            body: Some(serde_json::json!({"error": "invalid_grant"})),
        };
        assert_eq!(err.to_string(), "token refresh failed [400]: Bad Request");
    }

    #[test]
    fn display_exchange_failure() {
        let err = AuthError::AuthExchangeFailed {
            status: 401,
            reason: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "auth request failed [401]: Unauthorized");
    }
}
