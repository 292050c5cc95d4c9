//! Stowage Core - Digest Functions and Key Model
//!
//! Pure building blocks shared by every other stowage crate: the digest
//! function registry, entry kinds, cache key derivation and the error
//! taxonomy. Nothing in here performs I/O.

pub mod entry;
pub mod error;
pub mod hashing;

pub use entry::{lookup_key, transform_action_cache_key, EntryKind};
pub use error::{
    AssetError, CacheError, ConfigError, HashingError, StowageError, StowageResult,
};
pub use hashing::{DigestFunction, HashStream, Hasher, HasherRegistry, HasherRegistryBuilder};
