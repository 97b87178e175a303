//! ocm-auth
//!
//! OAuth credential lifecycle for the market-data provider:
//! - [`secret_store`]: durable secret-store contract plus file/in-memory backends.
//! - [`token_store`]: credential load/save with a local-cache fast path.
//! - [`session`]: authorization-code and refresh-token exchanges.
//!
//! [`AuthSession`] is the single writer of the live [`Credential`]. Every new
//! credential goes through the injected [`TokenSink`] before it replaces the
//! in-memory value.

pub mod error;
pub mod secret_store;
pub mod session;
pub mod token_store;

pub use error::AuthError;
pub use ocm_schemas::Credential;
pub use secret_store::{FileSecretStore, MemorySecretStore, SecretStore};
pub use session::{extract_auth_code, AuthSession, RedirectPrompt, TokenSink};
pub use token_store::TokenStore;
