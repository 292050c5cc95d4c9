//! Cache and proxy backend traits.
//!
//! The asset layer only ever talks to storage through [`BlobCache`]. A
//! [`ProxyBackend`] is an optional slower/larger tier behind a cache; the
//! cache decides when to consult it.

use async_trait::async_trait;
use bytes::Bytes;
use stowage_core::{CacheError, EntryKind, Hasher};
use tokio::io::AsyncRead;

/// Readable blob contents.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Size of a stored entry as far as the backend knows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobSize {
    Known(u64),
    /// Present, but the backend cannot tell how large it is (e.g. an HTTP
    /// proxy that answered a HEAD without a content length).
    Unknown,
}

impl BlobSize {
    pub fn known(self) -> Option<u64> {
        match self {
            BlobSize::Known(size) => Some(size),
            BlobSize::Unknown => None,
        }
    }
}

/// Cache capability consumed by the asset layer.
///
/// `size` arguments are the caller's expectation, `None` when unknown.
/// Implementations must be safe for concurrent use and must treat repeated
/// `put`s of the same entry as idempotent: callers do not serialize
/// fetch-then-put sequences.
///
/// A CAS `put` must check that the bytes hash to `hash` before storing them;
/// callers may stream unverified downloads straight in.
#[async_trait]
pub trait BlobCache: Send + Sync {
    /// Whether the entry exists, and its size if known.
    async fn contains(
        &self,
        kind: EntryKind,
        hasher: &dyn Hasher,
        hash: &str,
        size: Option<u64>,
    ) -> Option<BlobSize>;

    /// Open an entry for reading from `offset`.
    ///
    /// Returns `Ok(None)` on a miss. The reported size is the logical size of
    /// the whole entry, not of the remaining stream.
    async fn get(
        &self,
        kind: EntryKind,
        hasher: &dyn Hasher,
        hash: &str,
        size: Option<u64>,
        offset: u64,
    ) -> Result<Option<(BlobReader, BlobSize)>, CacheError>;

    /// Store `size` bytes read from `data` under `hash`.
    ///
    /// A [`CacheError::ConcurrentWrite`] means an identical write won the
    /// race; see [`CacheError::is_benign`].
    async fn put(
        &self,
        kind: EntryKind,
        hasher: &dyn Hasher,
        hash: &str,
        size: u64,
        data: BlobReader,
    ) -> Result<(), CacheError>;
}

/// Optional remote tier behind a cache.
///
/// Implementations are expected to be safe for concurrent use.
#[async_trait]
pub trait ProxyBackend: Send + Sync {
    /// Make a reasonable effort to upload an entry in the background.
    ///
    /// Must not block the caller. Allowed to fail silently, for example
    /// under heavy load.
    fn put(&self, kind: EntryKind, hash: &str, logical_size: u64, size_on_disk: u64, data: Bytes);

    /// Fetch an entry, `Ok(None)` on a miss.
    async fn get(
        &self,
        kind: EntryKind,
        hash: &str,
        size: Option<u64>,
    ) -> Result<Option<(BlobReader, BlobSize)>, CacheError>;

    /// Whether the remote end has the entry, and its size if known.
    async fn contains(&self, kind: EntryKind, hash: &str, size: Option<u64>) -> Option<BlobSize>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups answered locally.
    pub hits: u64,
    /// Number of lookups that missed locally.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Total stored payload in bytes.
    pub memory_bytes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
