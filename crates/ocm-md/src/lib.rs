//! ocm-md
//!
//! Authenticated market-data client for the quote provider.
//!
//! This crate owns the transport and the refresh-and-retry policy only. It
//! does **not** interpret chain or quote payloads; they are returned as opaque
//! JSON documents.

pub mod client;
pub mod error;

pub use client::MarketDataClient;
pub use error::ClientError;

use ocm_schemas::ChainRequest;
use serde_json::Value;

/// Anything that can produce one chain document per request.
///
/// The orchestrator drives this trait so its batch loop can be exercised
/// without a provider.
pub trait ChainFetcher {
    fn get_chain(&mut self, req: &ChainRequest) -> Result<Value, ClientError>;
}

impl ChainFetcher for MarketDataClient {
    fn get_chain(&mut self, req: &ChainRequest) -> Result<Value, ClientError> {
        MarketDataClient::get_chain(self, req)
    }
}
