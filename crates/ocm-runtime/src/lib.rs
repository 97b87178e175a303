//! ocm-runtime
//!
//! Batch orchestration for the collector:
//! - [`market_hours`]: the New York session gate.
//! - [`orchestrator`]: the per-symbol fetch loop and its failure classification.
//! - [`workflow`]: wiring of config, backends, auth and storage for each entry point.

pub mod market_hours;
pub mod orchestrator;
pub mod workflow;

pub use market_hours::MarketWindow;
pub use orchestrator::{classify_chain_error, ChainFailure, FetchOrchestrator};
pub use workflow::{Backends, FetchOptions};
