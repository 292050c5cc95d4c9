//! Stowage Storage - Cache Traits and In-Memory Backend
//!
//! Defines the storage capabilities the asset layer consumes. The physical
//! disk engine and remote proxies live outside this workspace; only their
//! contracts are defined here, plus an in-memory implementation.

pub mod memory;
pub mod traits;

pub use memory::InMemoryCache;
pub use traits::{BlobCache, BlobReader, BlobSize, CacheStats, ProxyBackend};
