//! ocm-storage
//!
//! Object-storage side of the collector:
//! - [`object_store`]: the storage contract plus file-backed and in-memory backends.
//! - [`key`]: the deterministic artifact key scheme (flat and partitioned).
//! - [`persist`]: write one chain document and return its manifest record.
//! - [`reorganize`]: move flat keys into the date-partitioned layout.

pub mod key;
pub mod object_store;
pub mod persist;
pub mod reorganize;

pub use key::{partitioned_key_for, ArtifactKey, KeyLayout, KeyParseError, ParsedKey};
pub use object_store::{FsObjectStore, MemoryObjectStore, ObjectInfo, ObjectStore};
pub use persist::ArtifactPersister;
pub use reorganize::{DataReorganizer, ReorganizeReport};

/// Key root every artifact lives under.
pub const DATASETS_ROOT: &str = "datasets";

/// Data type tag for option-chain snapshots.
pub const CHAIN_DATA_TYPE: &str = "CHAIN";

/// Listing prefix matching flat-layout chain artifacts only.
pub const FLAT_CHAIN_PREFIX: &str = "datasets/CHAIN_";
