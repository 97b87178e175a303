use std::fmt;

use ocm_auth::AuthError;
use serde_json::Value;

/// Errors that a [`crate::MarketDataClient`] call may return.
#[derive(Debug)]
pub enum ClientError {
    /// Non-200 data response after any applicable refresh.
    ///
    /// `body` is the parsed JSON error payload when the provider sent one.
    ErrorCall {
        status: u16,
        reason: String,
        body: Option<Value>,
    },
    /// Only GET is supported. Programming error, not a runtime failure.
    UnsupportedMethod(String),
    /// Credential acquisition or refresh failed.
    Auth(AuthError),
    /// Network or transport failure.
    Transport(String),
    /// A 200 payload was not valid JSON.
    Decode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::ErrorCall { status, reason, .. } => {
                write!(f, "call failed [HTTP {status}]: {reason}")
            }
            ClientError::UnsupportedMethod(m) => write!(f, "{m} calls not allowed"),
            ClientError::Auth(e) => write!(f, "auth error: {e}"),
            ClientError::Transport(msg) => write!(f, "transport error: {msg}"),
            ClientError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Auth(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AuthError> for ClientError {
    fn from(e: AuthError) -> Self {
        ClientError::Auth(e)
    }
}
